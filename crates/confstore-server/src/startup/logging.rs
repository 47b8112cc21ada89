//! Console and rolling file logging
//!
//! Everything goes to stderr and to `confstore.log`. Persistence events are
//! also copied to `persistence.log`, importer and maintenance events to
//! `config-server.log`.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

const ROOT_LOG_FILE: &str = "confstore.log";

/// Extra log files and the target prefixes routed into each
const COMPONENT_LOGS: &[(&str, &[&str])] = &[
    ("persistence.log", &["confstore_persistence"]),
    (
        "config-server.log",
        &["confstore_config", "confstore_server::command"],
    ),
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(LogRotation::Daily),
            "hourly" => Ok(LogRotation::Hourly),
            "never" => Ok(LogRotation::Never),
            other => Err(format!("Invalid log rotation: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub console_output: bool,
    pub console_level: Level,
    pub file_logging: bool,
    pub file_level: Level,
    pub rotation: LogRotation,
}

fn default_log_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("confstore")
        .join("logs")
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

fn env_level(name: &str) -> Option<Level> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            console_output: true,
            console_level: Level::INFO,
            file_logging: true,
            file_level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `CONFSTORE_LOG_*` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let console_level = env_level("CONFSTORE_LOG_LEVEL").unwrap_or(defaults.console_level);

        Self {
            log_dir: std::env::var("CONFSTORE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            console_output: env_flag("CONFSTORE_LOG_CONSOLE", defaults.console_output),
            console_level,
            file_logging: env_flag("CONFSTORE_LOG_FILE", defaults.file_logging),
            file_level: env_level("CONFSTORE_LOG_FILE_LEVEL").unwrap_or(console_level),
            rotation: defaults.rotation,
        }
    }
}

/// Keeps the non-blocking file writers alive; dropping it flushes them.
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}

/// `RUST_LOG` wins over the configured level.
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

fn rolling_writer(
    config: &LoggingConfig,
    file_name: &str,
    guards: &mut Vec<WorkerGuard>,
) -> NonBlocking {
    let appender = RollingFileAppender::new(config.rotation.into(), &config.log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);
    writer
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let mut guards = Vec::new();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    // stderr, so YAML printed by commands on stdout stays parseable
    if config.console_output {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(level_filter(config.console_level))
                .boxed(),
        );
    }

    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;

        let root = rolling_writer(config, ROOT_LOG_FILE, &mut guards);
        layers.push(
            fmt::layer()
                .with_writer(root)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_filter(level_filter(config.file_level))
                .boxed(),
        );

        for (file_name, prefixes) in COMPONENT_LOGS {
            let targets = prefixes
                .iter()
                .fold(Targets::new(), |t, p| t.with_target(*p, LevelFilter::TRACE));
            let writer = rolling_writer(config, file_name, &mut guards);
            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(targets)
                    .boxed(),
            );
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if config.file_logging {
        tracing::info!(log_dir = %config.log_dir.display(), "file logging enabled");
    }

    Ok(LoggingGuard {
        _file_guards: guards,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.console_output);
        assert!(config.file_logging);
        assert_eq!(config.console_level, Level::INFO);
        assert!(config.log_dir.ends_with("confstore/logs"));
    }

    #[test]
    fn test_log_rotation_parse_and_convert() {
        assert_eq!("Daily".parse::<LogRotation>(), Ok(LogRotation::Daily));
        assert_eq!("never".parse::<LogRotation>(), Ok(LogRotation::Never));
        assert!("weekly".parse::<LogRotation>().is_err());

        assert!(matches!(Rotation::from(LogRotation::Hourly), Rotation::HOURLY));
        assert!(matches!(Rotation::from(LogRotation::Never), Rotation::NEVER));
    }

    #[test]
    fn test_component_logs_route_own_crates() {
        for (file_name, prefixes) in COMPONENT_LOGS {
            assert!(file_name.ends_with(".log"));
            assert_ne!(*file_name, ROOT_LOG_FILE);
            assert!(prefixes.iter().all(|p| p.starts_with("confstore_")));
        }
    }
}
