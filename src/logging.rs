//! Logging bootstrap.
//!
//! The subscriber is assembled as a flat stack of boxed layers: the level
//! filter, a console layer, and (when enabled) a rolling file layer. Filter
//! precedence: config level > `RUST_LOG` env var > "info".

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Keeps the non-blocking file writer flushing for the process lifetime.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops, which keeps test binaries happy.
pub fn init(cfg: &LoggingConfig) {
    let mut layers: Vec<BoxedLayer> = vec![resolve_filter(cfg).boxed(), console_layer(cfg.format)];
    if let Some(file) = file_layer(cfg) {
        layers.push(file);
    }
    let _ = tracing_subscriber::registry().with(layers).try_init();
}

fn resolve_filter(cfg: &LoggingConfig) -> EnvFilter {
    if let Some(level) = cfg.level {
        return EnvFilter::new(level.as_str());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    let base = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stdout);
    match format {
        LogFormat::Json => base.json().with_ansi(false).boxed(),
        LogFormat::Text => base.with_ansi(true).boxed(),
    }
}

/// Build the rolling file layer, or `None` (with a note on stderr) when file
/// logging is off or the directory cannot be created.
fn file_layer(cfg: &LoggingConfig) -> Option<BoxedLayer> {
    if !cfg.enable_file_logging {
        return None;
    }
    if let Err(err) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "Failed to create log directory '{}' ({err}), continuing with console logs only",
            cfg.dir
        );
        return None;
    }

    let appender = tracing_appender::rolling::RollingFileAppender::new(
        rotation_policy(&cfg.rotation),
        &cfg.dir,
        &cfg.filename,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let base = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer);
    Some(match cfg.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Text => base.boxed(),
    })
}

fn rotation_policy(raw: &str) -> Rotation {
    match raw.to_ascii_lowercase().as_str() {
        "daily" => Rotation::DAILY,
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        other => {
            eprintln!("Unknown log rotation '{other}', using daily");
            Rotation::DAILY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn config_level_beats_the_environment() {
        let cfg = LoggingConfig {
            level: Some(LogLevel::Debug),
            ..LoggingConfig::default()
        };
        assert_eq!(resolve_filter(&cfg).to_string(), "debug");
    }

    #[test]
    fn rotation_names_are_case_insensitive() {
        assert_eq!(rotation_policy("HOURLY"), Rotation::HOURLY);
        assert_eq!(rotation_policy("never"), Rotation::NEVER);
        assert_eq!(rotation_policy("weekly"), Rotation::DAILY);
    }

    #[test]
    fn file_layer_is_absent_when_disabled() {
        let cfg = LoggingConfig::default();
        assert!(!cfg.enable_file_logging);
        assert!(file_layer(&cfg).is_none());
    }
}
