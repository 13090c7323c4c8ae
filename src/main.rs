use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobpoll::cli::{Cli, Command};
use jobpoll::client::{JobClient, JobInput, RequestEncoding};
use jobpoll::config::JobpollConfig;
use jobpoll::engine::{Phase, PollingEngine, StatusView};
use jobpoll::ui::{self, JobProgress};

// How long to wait for the cancel acknowledgement after Ctrl-C.
const CANCEL_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            JobpollConfig::load_from(path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => JobpollConfig::load()?,
    };
    config.apply_base_url_override(cli.base_url);
    config.validate()?;
    debug!(base_url = %config.base_url, "configuration loaded");

    match cli.command {
        Command::Kinds => {
            ui::print_kinds(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Submit {
            kind,
            input,
            interval_ms,
            encoding,
            json,
        } => {
            let view = run_job(
                config,
                &kind,
                input,
                interval_ms,
                encoding.map(RequestEncoding::from),
                json,
            )
            .await?;
            Ok(match view.phase {
                Phase::Succeeded => ExitCode::SUCCESS,
                Phase::Canceled => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            })
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "jobpoll=debug" } else { "jobpoll=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_job(
    mut config: JobpollConfig,
    kind_name: &str,
    input: String,
    interval_ms: Option<u64>,
    encoding: Option<RequestEncoding>,
    json: bool,
) -> Result<StatusView> {
    let mut kind = config.kind(kind_name)?.clone();
    if let Some(ms) = interval_ms {
        kind.poll_interval_ms = Some(ms);
    }
    if let Some(encoding) = encoding {
        kind.encoding = encoding;
    }
    config.jobs.insert(kind_name.to_string(), kind.clone());
    config.validate()?;

    let options = config.engine_options(&kind);
    let client = JobClient::new(config.transport()?, kind.endpoint.clone(), kind.encoding);
    let engine = PollingEngine::spawn(client, options);

    let mut progress = JobProgress::start(kind_name);
    let mut status = engine.subscribe();
    engine.submit(JobInput::new(input)).await;
    info!(
        kind = kind_name,
        endpoint = %kind.endpoint,
        encoding = %kind.encoding,
        interval_ms = options.interval.as_millis() as u64,
        "job submitted"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let view = loop {
        let view = status.borrow_and_update().clone();
        progress.update(&view);
        if view.phase.is_terminal() {
            break view;
        }

        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break engine.status();
                }
            }
            _ = &mut ctrl_c => {
                warn!("interrupted, canceling job");
                engine.cancel().await;
                status.mark_unchanged();
                if tokio::time::timeout(CANCEL_GRACE, status.changed()).await.is_err() {
                    debug!("no cancel acknowledgement within {:?}", CANCEL_GRACE);
                }
                break engine.status();
            }
        }
    };

    progress.complete(&view);
    if json {
        progress.print_json(&view);
    }
    info!(phase = %view.phase, "job finished");
    Ok(view)
}
