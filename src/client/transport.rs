use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use super::error::TransportError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra headers attached to a single request.
pub type Headers = Vec<(&'static str, String)>;

/// A response as it came off the wire, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Reason phrase for `status`, if the transport knows one.
    pub reason: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            reason: Some("OK".to_string()),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves JSON bodies to and from a job endpoint.
///
/// Only network-level failures are errors here; a non-2xx response is still a
/// `RawResponse` and is interpreted by the job client.
pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        endpoint: &str,
        body: String,
        headers: Headers,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;

    fn get_json(
        &self,
        endpoint: &str,
        headers: Headers,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// The request timeout is the only bound on a hung exchange; the engine
    /// itself never times out.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        let base_url = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

impl Transport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        body: String,
        headers: Headers,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self
            .client
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;
        Self::read(response).await
    }

    async fn get_json(
        &self,
        endpoint: &str,
        headers: Headers,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self.client.get(self.url(endpoint));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;
        Self::read(response).await
    }
}
