use super::config::{LogFormat, LoggingConfig, RotationPolicy};
use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Owns the tracing subscriber's non-blocking writer guard; dropping it
/// flushes any buffered log lines.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Initialize the global tracing subscriber from `config`. Builds a
    /// stdout layer (JSON or pretty, per `config.format`) and, when
    /// `log_dir` is set, an additional JSON file layer with the requested
    /// rotation policy.
    ///
    /// # Errors
    /// Returns an error if `config.level` does not parse as a tracing level.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

        let (non_blocking_writer, guard) = match config.log_dir.as_ref() {
            Some(log_dir) => {
                let file_appender = match config.rotation {
                    RotationPolicy::Daily => rolling::daily(log_dir, "maestro.log"),
                    RotationPolicy::Hourly => rolling::hourly(log_dir, "maestro.log"),
                    RotationPolicy::Never => rolling::never(log_dir, "maestro.log"),
                };
                let (writer, guard) = tracing_appender::non_blocking(file_appender);
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };
        let file_tracing_layer = non_blocking_writer
            .map(|writer| tracing_subscriber::fmt::layer().json().with_writer(writer).with_ansi(false).with_target(true).with_file(true).with_line_number(true));

        let registry = tracing_subscriber::registry().with(env_filter).with(file_tracing_layer);

        if config.enable_stdout {
            match config.format {
                LogFormat::Json => {
                    registry.with(tracing_subscriber::fmt::layer().json().with_writer(io::stdout).with_target(true).with_file(true).with_line_number(true)).init();
                }
                LogFormat::Pretty => {
                    registry.with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stdout).with_target(true).with_file(true).with_line_number(true)).init();
                }
            }
        } else {
            registry.init();
        }

        tracing::info!(level = %config.level, format = ?config.format, file_output = config.log_dir.is_some(), "logger initialized");

        Ok(Self { _guard: guard })
    }

    #[cfg(test)]
    pub fn guard(&self) -> &Option<WorkerGuard> {
        &self._guard
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("invalid log level: {level}"),
    }
}
