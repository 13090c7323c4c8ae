//! Interface de terminal do jobpoll: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente
//! um job enquanto o motor de polling publica novos status.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::JobpollConfig;
use crate::engine::{Phase, StatusView};

/// Indicador visual de progresso de um job no terminal.
///
/// Exibe uma barra de 0 a 100 durante o polling e mensagens coloridas para
/// sucesso (verde), falha (vermelho) e cancelamento (amarelo).
pub struct JobProgress {
    // Barra de progresso do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    // Último erro exibido, para não repetir a mesma linha a cada poll.
    shown_error: String,
}

impl JobProgress {
    /// Cria a barra com o tipo de job como prefixo.
    pub fn start(kind: &str) -> Self {
        let pb = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
        ) {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix(kind.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            shown_error: String::new(),
        }
    }

    /// Reflete um novo status publicado pelo motor.
    pub fn update(&mut self, view: &StatusView) {
        self.pb.set_position(u64::from(view.progress_percent));
        self.pb.set_message(format!("{} {}", view.phase, view.result));
        if view.last_error != self.shown_error {
            if !view.last_error.is_empty() {
                self.pb.println(format!(
                    "  {} {}",
                    self.yellow.apply_to("!"),
                    self.dim.apply_to(&view.last_error)
                ));
            }
            self.shown_error = view.last_error.clone();
        }
    }

    /// Finaliza a barra e exibe o resultado final do job.
    pub fn complete(&self, view: &StatusView) {
        self.pb.finish_and_clear();
        match view.phase {
            Phase::Succeeded => {
                println!("  {} {}", self.green.apply_to("✓"), view.result);
            }
            Phase::Failed => {
                println!("  {} Job failed: {}", self.red.apply_to("✗"), view.result);
            }
            Phase::Canceled => {
                println!("  {} {}", self.yellow.apply_to("⊘"), view.result);
            }
            _ => {
                println!("  {} {} {}", self.dim.apply_to("…"), view.phase, view.result);
            }
        }
        if !view.last_error.is_empty() && view.phase != Phase::Failed {
            println!("    {}", self.dim.apply_to(&view.last_error));
        }
    }

    /// Imprime o status final formatado em JSON.
    pub fn print_json(&self, view: &StatusView) {
        println!("{}", serde_json::to_string_pretty(view).unwrap_or_default());
    }
}

/// Lista os tipos de job configurados, um por linha.
pub fn print_kinds(config: &JobpollConfig) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    for (name, kind) in &config.jobs {
        let interval = kind.poll_interval_ms.unwrap_or(config.poll_interval_ms);
        println!(
            "{:<16} {} {}",
            bold.apply_to(name),
            kind.endpoint,
            dim.apply_to(format!("({}, every {interval}ms)", kind.encoding))
        );
    }
}
