//! Tipos de erro para o cliente de jobs.
//!
//! Define [`TransportError`], o erro uniforme de uma única troca com o backend.
//! A mensagem exibida segue a prioridade: mensagem embutida no corpo de erro,
//! código/frase de status HTTP e, por fim, o genérico `"Server error"`.

use serde::Deserialize;
use thiserror::Error;

/// Falha de rede ou de protocolo em uma troca.
///
/// Recuperável: durante o polling vira apenas texto de exibição e a próxima
/// tentativa acontece no tick seguinte.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Mensagem embutida no corpo de erro ou vinda da camada de rede.
    #[error("{0}")]
    Message(String),

    /// Status HTTP não-2xx sem mensagem aproveitável no corpo.
    #[error("{status} - {reason}")]
    Status { status: u16, reason: String },

    /// Nenhuma informação disponível sobre a falha.
    #[error("Server error")]
    Server,
}

impl TransportError {
    /// Constrói o erro de uma resposta não-2xx.
    pub fn from_response(status: u16, reason: Option<&str>, body: &str) -> Self {
        if let Some(message) = embedded_message(body) {
            return Self::Message(message);
        }
        match reason.filter(|r| !r.is_empty()) {
            Some(reason) => Self::Status {
                status,
                reason: reason.to_string(),
            },
            None => Self::Server,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Message(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

fn embedded_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    [parsed.message, parsed.error]
        .into_iter()
        .find(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_message_wins() {
        let err = TransportError::from_response(
            500,
            Some("Internal Server Error"),
            r#"{"message": "queue is down"}"#,
        );
        assert_eq!(err.to_string(), "queue is down");
    }

    #[test]
    fn embedded_error_field_is_used() {
        let err = TransportError::from_response(400, Some("Bad Request"), r#"{"error": "bad url"}"#);
        assert_eq!(err, TransportError::Message("bad url".into()));
    }

    #[test]
    fn status_reason_when_body_is_not_json() {
        let err = TransportError::from_response(503, Some("Service Unavailable"), "<html>");
        assert_eq!(err.to_string(), "503 - Service Unavailable");
    }

    #[test]
    fn generic_fallback() {
        let err = TransportError::from_response(599, None, "");
        assert_eq!(err.to_string(), "Server error");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransportError>();
    }
}
