//! `tracing` subscriber setup for the CLI.
//!
//! Three output formats:
//! - **pretty**: multi-line, human-readable
//! - **compact**: one line per event
//! - **json**: one JSON object per event, for log aggregation
//!
//! `RUST_LOG` takes precedence over `--log-level` when set. Logs go to
//! stderr so command output on stdout stays pipeable.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

pub fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer().pretty().with_writer(std::io::stderr).with_target(true);
            tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer().compact().with_writer(std::io::stderr).with_target(false);
            tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_target(true);
            tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;
        }
    }

    tracing::debug!(?format, level, "logging initialized");
    Ok(())
}
