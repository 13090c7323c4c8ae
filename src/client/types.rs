//! Tipos de dados trocados com o processador de jobs remoto.
//!
//! [`JobStatus`] é o registro canônico devolvido pelo backend em toda troca.
//! [`RequestEncoding`] decide o formato do corpo enviado para cada [`Intent`],
//! permitindo que um único cliente atenda todos os tipos de job.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Cabeçalho que carrega o identificador da requisição em polls e cancelamentos.
pub const REQUEST_ID_HEADER: &str = "Request-Id";

/// Intenção de uma troca com o backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Poll,
    Cancel,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Create => write!(f, "create"),
            Intent::Poll => write!(f, "poll"),
            Intent::Cancel => write!(f, "cancel"),
        }
    }
}

/// Payload fornecido pelo chamador para uma submissão (texto livre ou URL).
///
/// Imutável depois de construído; cada troca deriva dele um [`JobRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    payload: String,
}

impl JobInput {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Deriva a requisição de uma troca, anexando o `request_id` quando conhecido.
    pub fn request(&self, intent: Intent, request_id: Option<&str>) -> JobRequest {
        JobRequest {
            payload: self.payload.clone(),
            intent,
            request_id: request_id
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }
}

/// Uma troca pronta para ser enviada pelo [`JobClient`](super::JobClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub payload: String,
    pub intent: Intent,
    /// Identificador de correlação, enviado fora do corpo (cabeçalho).
    pub request_id: Option<String>,
}

/// Registro de status devolvido pelo backend.
///
/// Campos ausentes no JSON assumem string vazia, 0 ou `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatus {
    /// Namespace lógico ao qual o job pertence.
    pub bucket: String,
    /// Timestamp de criação definido pelo backend (RFC 3339).
    pub created_at: String,
    /// Identificador estável do item armazenado.
    pub key: String,
    /// Último resultado (parcial ou final) calculado.
    pub value: String,
    /// Percentual de conclusão; 100 significa sucesso terminal.
    ///
    /// Valores negativos viram 0 e frações são truncadas; um valor não numérico
    /// vira 0 sem invalidar o restante do registro.
    #[serde(deserialize_with = "lenient_progress")]
    pub progress: u32,
    /// `true` quando o backend reconheceu um cancelamento.
    pub canceled: bool,
    /// Mensagem de falha terminal; vazia quando não há erro.
    pub error: String,
    /// Identificador usado para endereçar polls subsequentes.
    pub request_id: String,
}

impl JobStatus {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }

    pub fn is_failed(&self) -> bool {
        !self.error.is_empty()
    }

    /// Um job é terminal quando concluiu, falhou ou foi cancelado.
    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_failed() || self.canceled
    }

    /// Status totalmente vazio: "sem informação ainda", não um erro.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Progresso limitado ao intervalo 0–100.
    pub fn progress_percent(&self) -> u8 {
        self.progress.min(100) as u8
    }

    /// Interpreta `created_at`; `None` se vazio ou inválido.
    pub fn created_at_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Int(i64),
    Float(f64),
    Other(IgnoredAny),
}

fn lenient_progress<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawProgress::deserialize(deserializer)? {
        RawProgress::Int(n) => u32::try_from(n.max(0)).unwrap_or(u32::MAX),
        // Float-to-int casts saturate and map NaN to 0.
        RawProgress::Float(f) => f as u32,
        RawProgress::Other(_) => 0,
    })
}

/// Formato de corpo usado por um tipo de job.
///
/// As variantes cobrem as quatro formas de requisição aceitas pelo backend:
/// - [`Tagged`](RequestEncoding::Tagged) — `{"payload", "intent"}`; poll via GET
/// - [`CreateFlag`](RequestEncoding::CreateFlag) — `{"data_from_frontend", "create_request"}`; poll via GET
/// - [`CancelFlag`](RequestEncoding::CancelFlag) — `{"data_from_frontend", "cancel_request"}`; poll reenvia o POST
/// - [`DeleteFlag`](RequestEncoding::DeleteFlag) — `{"data_from_frontend", "delete_request"}`; poll reenvia o POST
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestEncoding {
    #[default]
    Tagged,
    CreateFlag,
    CancelFlag,
    DeleteFlag,
}

/// Forma de uma requisição no fio.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Post { body: Value },
    Get,
}

impl RequestEncoding {
    pub fn encode(&self, payload: &str, intent: Intent) -> WireRequest {
        match (self, intent) {
            (RequestEncoding::Tagged | RequestEncoding::CreateFlag, Intent::Poll) => {
                WireRequest::Get
            }
            (RequestEncoding::Tagged, intent) => WireRequest::Post {
                body: json!({ "payload": payload, "intent": intent }),
            },
            (RequestEncoding::CreateFlag, intent) => WireRequest::Post {
                body: json!({
                    "data_from_frontend": payload,
                    "create_request": intent == Intent::Create,
                }),
            },
            (RequestEncoding::CancelFlag, intent) => WireRequest::Post {
                body: json!({
                    "data_from_frontend": payload,
                    "cancel_request": intent == Intent::Cancel,
                }),
            },
            (RequestEncoding::DeleteFlag, intent) => WireRequest::Post {
                body: json!({
                    "data_from_frontend": payload,
                    "delete_request": intent == Intent::Cancel,
                }),
            },
        }
    }
}

impl fmt::Display for RequestEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestEncoding::Tagged => write!(f, "tagged"),
            RequestEncoding::CreateFlag => write!(f, "create-flag"),
            RequestEncoding::CancelFlag => write!(f, "cancel-flag"),
            RequestEncoding::DeleteFlag => write!(f, "delete-flag"),
        }
    }
}
