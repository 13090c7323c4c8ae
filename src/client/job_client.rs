use tracing::debug;

use super::error::TransportError;
use super::transport::{Headers, RawResponse, Transport};
use super::types::{JobRequest, JobStatus, REQUEST_ID_HEADER, RequestEncoding, WireRequest};

/// Performs single request/response exchanges against one job endpoint.
///
/// Holds no job state; the polling engine owns everything that changes.
pub struct JobClient<T> {
    transport: T,
    endpoint: String,
    encoding: RequestEncoding,
}

impl<T: Transport> JobClient<T> {
    pub fn new(transport: T, endpoint: impl Into<String>, encoding: RequestEncoding) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            encoding,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn encoding(&self) -> RequestEncoding {
        self.encoding
    }

    pub async fn send(&self, request: &JobRequest) -> Result<JobStatus, TransportError> {
        let headers: Headers = request
            .request_id
            .iter()
            .map(|id| (REQUEST_ID_HEADER, id.clone()))
            .collect();

        debug!(
            endpoint = %self.endpoint,
            intent = %request.intent,
            request_id = request.request_id.as_deref().unwrap_or(""),
            "sending job request"
        );

        let raw = match self.encoding.encode(&request.payload, request.intent) {
            WireRequest::Post { body } => {
                self.transport
                    .post_json(&self.endpoint, body.to_string(), headers)
                    .await?
            }
            WireRequest::Get => self.transport.get_json(&self.endpoint, headers).await?,
        };

        normalize(raw)
    }
}

/// Turns a raw response into a status record.
///
/// A successful response whose body is empty or unparseable yields an empty
/// `JobStatus` rather than an error.
pub fn normalize(raw: RawResponse) -> Result<JobStatus, TransportError> {
    if !raw.is_success() {
        return Err(TransportError::from_response(
            raw.status,
            raw.reason.as_deref(),
            &raw.body,
        ));
    }

    if raw.body.trim().is_empty() {
        return Ok(JobStatus::default());
    }

    match serde_json::from_str::<JobStatus>(&raw.body) {
        Ok(status) => Ok(status),
        Err(e) => {
            debug!("unparseable job status body, treating as empty: {e}");
            Ok(JobStatus::default())
        }
    }
}
