use crate::settings::{Settings, DEFAULT_LOG_FILENAME};
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

const DEFAULT_LEVEL: &str = "info";

fn rotation(name: Option<&str>) -> Result<Rotation> {
    match name.map(str::to_ascii_lowercase).as_deref() {
        None | Some("daily") => Ok(Rotation::DAILY),
        Some("hourly") => Ok(Rotation::HOURLY),
        Some("minutely") => Ok(Rotation::MINUTELY),
        Some("never") => Ok(Rotation::NEVER),
        Some(other) => anyhow::bail!("Unknown log rotation '{}'", other),
    }
}

/// `RUST_LOG` wins over the configured level.
fn filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LEVEL)))
}

/// Installs the global subscriber. Everything goes to stderr since stdout
/// carries JSON-RPC in stdio mode. `log` records from the client are
/// forwarded into tracing.
///
/// Keep the returned guard alive for as long as the file log should flush.
pub fn init(settings: &Settings) -> Result<Option<WorkerGuard>> {
    tracing_log::LogTracer::init().context("Failed to forward log records")?;

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = if settings.log_file_enable.unwrap_or(false) {
        let appender = RollingFileAppender::new(
            rotation(settings.log_rotate.as_deref())?,
            settings.log_dir.as_deref().unwrap_or("."),
            settings
                .log_filename
                .as_deref()
                .unwrap_or(DEFAULT_LOG_FILENAME),
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let subscriber = Registry::default()
        .with(filter(settings.log_level.as_deref()))
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation(None).unwrap(), Rotation::DAILY);
        assert_eq!(rotation(Some("Hourly")).unwrap(), Rotation::HOURLY);
        assert_eq!(rotation(Some("never")).unwrap(), Rotation::NEVER);
        assert!(rotation(Some("weekly")).is_err());
    }
}
