mod cli;
mod control;
mod engine;
mod error;
mod model;
mod notice;
mod orchestrator;
mod surface;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Route diagnostics to stderr in one-shot mode, otherwise to a log file.
///
/// Verbosity: 0 warn, 1 info, 2 debug, 3+ trace. `RUST_LOG` overrides.
fn init_tracing(args: &cli::Cli) -> Result<()> {
    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let (writer, ansi) = match args.log_path() {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create log directory {}", dir.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            (BoxMakeWriter::new(std::sync::Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(ansi))
        .with(filter)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(&args)?;
    let is_one_shot = !args.is_interactive();

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) if is_one_shot => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}
