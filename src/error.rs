use thiserror::Error;

use crate::client::TransportError;

#[derive(Debug, Error)]
pub enum JobpollError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown job kind: {0}. Run `jobpoll kinds` to list the configured kinds.")]
    UnknownJobKind(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
