//! Configuração do jobpoll carregada a partir de `jobpoll.toml`.
//!
//! A struct [`JobpollConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis, e os tipos de job
//! embutidos (`word-predict`, `cats-vs-dogs`, `mnist`) estão sempre disponíveis.
//! A variável de ambiente `JOBPOLL_BASE_URL` tem precedência sobre o arquivo.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::client::{HttpTransport, RequestEncoding};
use crate::engine::{EngineOptions, OverlapPolicy};
use crate::error::JobpollError;

/// Arquivo procurado no diretório atual quando `--config` não é informado.
pub const CONFIG_FILE: &str = "jobpoll.toml";

/// Variável de ambiente que sobrescreve `base_url`.
pub const BASE_URL_ENV: &str = "JOBPOLL_BASE_URL";

const MAX_INTERVAL_MS: u64 = 60_000;

/// Um tipo de job: endpoint e formato de requisição.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobKind {
    /// Caminho relativo a `base_url` ou URL absoluta.
    pub endpoint: String,

    /// Formato do corpo das requisições.
    #[serde(default)]
    pub encoding: RequestEncoding,

    /// Intervalo de polling específico deste tipo, em milissegundos.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

/// Configuração de nível superior carregada de `jobpoll.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobpollConfig {
    /// URL base do processador de jobs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Intervalo padrão entre polls, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout de conexão em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout de cada requisição em segundos; único limite para uma troca travada.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Comportamento quando um tick dispara com um poll ainda pendente.
    #[serde(default)]
    pub overlap: OverlapPolicy,

    /// Tipos de job adicionais ou que substituem os embutidos.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobKind>,
}

// Valor padrão para a URL base: servidor local.
fn default_base_url() -> String {
    "http://localhost:4200".to_string()
}

// Valor padrão para o intervalo de polling: 500ms.
fn default_poll_interval_ms() -> u64 {
    500
}

// Valor padrão para o timeout de conexão: 10s.
fn default_connect_timeout_secs() -> u64 {
    10
}

// Valor padrão para o timeout de requisição: 30s.
fn default_request_timeout_secs() -> u64 {
    30
}

fn builtin_kinds() -> BTreeMap<String, JobKind> {
    let kind = |endpoint: &str, encoding, poll_interval_ms| JobKind {
        endpoint: endpoint.to_string(),
        encoding,
        poll_interval_ms,
    };
    BTreeMap::from([
        (
            "word-predict".to_string(),
            kind("/word-predict-request", RequestEncoding::DeleteFlag, None),
        ),
        (
            "cats-vs-dogs".to_string(),
            kind("/cats-vs-dogs-request", RequestEncoding::DeleteFlag, Some(1500)),
        ),
        (
            "mnist".to_string(),
            kind("/mnist-request", RequestEncoding::DeleteFlag, Some(1000)),
        ),
    ])
}

impl Default for JobpollConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            overlap: OverlapPolicy::default(),
            jobs: builtin_kinds(),
        }
    }
}

impl JobpollConfig {
    /// Carrega a configuração de `jobpoll.toml` no diretório atual.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de `path`, usando valores padrão se o arquivo não existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(JobpollError::from)?;
            Self::from_toml(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        config.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Interpreta o conteúdo TOML e completa com os tipos embutidos.
    pub fn from_toml(contents: &str) -> Result<Self, JobpollError> {
        let mut config: JobpollConfig = toml::from_str(contents)?;
        for (name, kind) in builtin_kinds() {
            config.jobs.entry(name).or_insert(kind);
        }
        Ok(config)
    }

    pub fn apply_base_url_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url
            && !url.is_empty()
        {
            self.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), JobpollError> {
        if self.base_url.is_empty() {
            return Err(JobpollError::Config("base_url cannot be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(JobpollError::Config(
                "base_url must start with http:// or https://".into(),
            ));
        }
        check_interval("poll_interval_ms", self.poll_interval_ms)?;
        if self.request_timeout_secs == 0 {
            return Err(JobpollError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        for (name, kind) in &self.jobs {
            if kind.endpoint.is_empty() {
                return Err(JobpollError::Config(format!(
                    "jobs.{name}.endpoint cannot be empty"
                )));
            }
            if let Some(ms) = kind.poll_interval_ms {
                check_interval(&format!("jobs.{name}.poll_interval_ms"), ms)?;
            }
        }
        Ok(())
    }

    pub fn kind(&self, name: &str) -> Result<&JobKind, JobpollError> {
        self.jobs
            .get(name)
            .ok_or_else(|| JobpollError::UnknownJobKind(name.to_string()))
    }

    /// Opções do motor de polling para um tipo de job.
    pub fn engine_options(&self, kind: &JobKind) -> EngineOptions {
        let interval_ms = kind.poll_interval_ms.unwrap_or(self.poll_interval_ms);
        EngineOptions {
            interval: Duration::from_millis(interval_ms),
            overlap: self.overlap,
        }
    }

    pub fn transport(&self) -> Result<HttpTransport, JobpollError> {
        let transport = HttpTransport::with_timeouts(
            self.base_url.clone(),
            Duration::from_secs(self.connect_timeout_secs),
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(transport)
    }
}

fn check_interval(field: &str, ms: u64) -> Result<(), JobpollError> {
    if ms == 0 || ms > MAX_INTERVAL_MS {
        return Err(JobpollError::Config(format!(
            "{field} must be between 1 and {MAX_INTERVAL_MS}"
        )));
    }
    Ok(())
}
