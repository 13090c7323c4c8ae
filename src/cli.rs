//! Interface de linha de comando do jobpoll baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (submit, kinds)
//! e flags globais (--base-url, --config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::client::RequestEncoding;

/// jobpoll — submete jobs de longa duração e acompanha o progresso até o fim.
#[derive(Debug, Parser)]
#[command(name = "jobpoll", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base do processador de jobs (sobrescreve o arquivo e o ambiente).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Caminho do arquivo de configuração TOML.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Formato de requisição aceito pela CLI, mapeado para [`RequestEncoding`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncodingArg {
    /// Corpo `{payload, intent}` e poll via GET.
    Tagged,
    /// Corpo `{data_from_frontend, create_request}` e poll via GET.
    CreateFlag,
    /// Corpo `{data_from_frontend, cancel_request}`; o poll reenvia o POST.
    CancelFlag,
    /// Corpo `{data_from_frontend, delete_request}`; o poll reenvia o POST.
    DeleteFlag,
}

impl From<EncodingArg> for RequestEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Tagged => RequestEncoding::Tagged,
            EncodingArg::CreateFlag => RequestEncoding::CreateFlag,
            EncodingArg::CancelFlag => RequestEncoding::CancelFlag,
            EncodingArg::DeleteFlag => RequestEncoding::DeleteFlag,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submete um job e acompanha até um estado terminal. Ctrl-C cancela.
    Submit {
        /// Tipo de job configurado (veja `jobpoll kinds`).
        kind: String,

        /// Entrada do job, enviada como payload.
        input: String,

        /// Intervalo entre polls em milissegundos.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Formato de requisição, sobrescrevendo o do tipo de job.
        #[arg(long, value_enum)]
        encoding: Option<EncodingArg>,

        /// Imprime o status final em JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Lista os tipos de job configurados.
    Kinds,
}
