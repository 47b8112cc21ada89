//! Configuration management for the confstore binary
//!
//! Layers `conf/application.yml`, `CONFSTORE_*` environment variables, and
//! command line overrides, in that order.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use config::{Config, Environment};
use sea_orm::{ConnectOptions, ConnectionTrait, Database};
use tracing::Level;

use confstore_config::SameConfigPolicy;
use confstore_persistence::{DataSource, Platform, dialect_for, schema};

use super::constants::*;
use crate::startup::{LogRotation, LoggingConfig};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "confstore", version, about = "Relational configuration store")]
pub struct Cli {
    /// Configuration file, optional
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// mysql, postgresql or sqlite
    #[arg(long = "platform")]
    pub platform: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Default, PartialEq, Subcommand)]
pub enum Command {
    /// Run maintenance tasks until interrupted
    #[default]
    Serve,
    /// Recompute content fingerprints once
    Repair,
    /// Import records from a YAML or JSON file
    Import {
        #[arg(short, long)]
        file: PathBuf,
        /// Namespace for items that do not name one
        #[arg(short, long)]
        tenant: Option<String>,
        #[arg(short, long, default_value = "abort")]
        policy: SameConfigPolicy,
    },
    /// Print records as YAML
    Export {
        #[arg(short, long, default_value = "")]
        tenant: String,
        #[arg(long)]
        data_id: Option<String>,
        #[arg(short, long)]
        group: Option<String>,
        #[arg(short, long)]
        app: Option<String>,
    },
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&cli.config_file).required(false))
            .add_source(
                Environment::with_prefix("confstore")
                    .prefix_separator("_")
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(v) = &cli.database_url {
            config_builder = config_builder.set_override(DB_URL, v.as_str())?;
        }
        if let Some(v) = &cli.platform {
            config_builder = config_builder.set_override(DB_PLATFORM, v.as_str())?;
        }

        let app_config = config_builder
            .build()
            .with_context(|| format!("Failed to build configuration from {}", cli.config_file))?;

        Ok(Configuration { config: app_config })
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Database Configuration
    // ========================================================================

    pub fn database_url(&self) -> anyhow::Result<String> {
        self.config
            .get_string(DB_URL)
            .with_context(|| format!("{} is not configured", DB_URL))
    }

    /// Declared platform, or the one implied by the url scheme
    pub fn datasource_platform(&self) -> anyhow::Result<Platform> {
        if let Ok(v) = self.config.get_string(DB_PLATFORM) {
            return Ok(v.parse()?);
        }

        let url = self.database_url()?;
        Platform::from_url(&url)
            .ok_or_else(|| anyhow!("cannot infer {} from url scheme, set it explicitly", DB_PLATFORM))
    }

    pub fn connect_options(&self) -> anyhow::Result<ConnectOptions> {
        let max_connections = self.config.get_int(DB_POOL_MAX).unwrap_or(100) as u32;
        let min_connections = self.config.get_int(DB_POOL_MIN).unwrap_or(1) as u32;
        let connect_timeout = self.config.get_int(DB_POOL_CONNECT_TIMEOUT).unwrap_or(30) as u64;
        let acquire_timeout = self.config.get_int(DB_POOL_ACQUIRE_TIMEOUT).unwrap_or(8) as u64;
        let idle_timeout = self.config.get_int(DB_POOL_IDLE_TIMEOUT).unwrap_or(10) as u64;
        let max_lifetime = self.config.get_int(DB_POOL_MAX_LIFETIME).unwrap_or(1800) as u64;
        let sqlx_logging = self.config.get_bool(DB_POOL_SQLX_LOGGING).unwrap_or(false);

        let mut opt = ConnectOptions::new(self.database_url()?);

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .sqlx_logging(sqlx_logging);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            max_lifetime = max_lifetime,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        Ok(opt)
    }

    /// Connect and pair the pool with the configured dialect.
    ///
    /// SQLite databases get the embedded schema installed.
    pub async fn data_source(&self) -> anyhow::Result<DataSource> {
        let platform = self.datasource_platform()?;
        let options = self.connect_options()?;
        let url = options.get_url().to_string();

        let conn = Database::connect(options)
            .await
            .context("Failed to connect to database")?;

        let dialect = dialect_for(platform);
        if dialect.backend() != conn.get_database_backend() {
            bail!(
                "{} is {} but the url connects to {:?}",
                DB_PLATFORM,
                platform,
                conn.get_database_backend()
            );
        }

        if matches!(platform, Platform::Sqlite) {
            schema::install_sqlite_schema(&conn).await?;
        }

        tracing::info!(platform = %platform, "Database connected");
        Ok(DataSource::with_dialect(conn, url, dialect))
    }

    // ========================================================================
    // Maintenance Configuration
    // ========================================================================

    pub fn history_retention_days(&self) -> i64 {
        self.config
            .get_int(HISTORY_RETENTION_DAYS)
            .unwrap_or(DEFAULT_RETENTION_DAYS)
    }

    pub fn history_sweep_max_rows(&self) -> u64 {
        self.config
            .get_int(HISTORY_SWEEP_MAX_ROWS)
            .map(|v| v.max(1) as u64)
            .unwrap_or(DEFAULT_SWEEP_MAX_ROWS)
    }

    pub fn history_sweep_interval_secs(&self) -> u64 {
        self.config
            .get_int(HISTORY_SWEEP_INTERVAL_SECONDS)
            .map(|v| v.max(1) as u64)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS)
    }

    pub fn repair_on_startup(&self) -> bool {
        self.config.get_bool(REPAIR_ON_STARTUP).unwrap_or(false)
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    /// Config keys win over `CONFSTORE_LOG_*` environment variables.
    pub fn logging_config(&self) -> LoggingConfig {
        let env = LoggingConfig::from_env();
        let level = self
            .config
            .get_string(LOGS_LEVEL)
            .ok()
            .and_then(|v| v.parse::<Level>().ok());

        LoggingConfig {
            log_dir: self
                .config
                .get_string(LOGS_PATH)
                .map(PathBuf::from)
                .unwrap_or(env.log_dir),
            console_output: self
                .config
                .get_bool(LOGS_CONSOLE)
                .unwrap_or(env.console_output),
            console_level: level.unwrap_or(env.console_level),
            file_logging: self.config.get_bool(LOGS_FILE).unwrap_or(env.file_logging),
            file_level: level.unwrap_or(env.file_level),
            rotation: self
                .config
                .get_string(LOGS_ROTATION)
                .ok()
                .and_then(|v| v.parse::<LogRotation>().ok())
                .unwrap_or(env.rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration(pairs: &[(&str, &str)]) -> Configuration {
        let mut builder = Config::builder();
        for (k, v) in pairs {
            builder = builder.set_override(*k, *v).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_platform_inferred_from_url() {
        let c = configuration(&[(DB_URL, "postgres://u:p@localhost/confstore")]);
        assert!(matches!(c.datasource_platform().unwrap(), Platform::Postgresql));

        let c = configuration(&[(DB_URL, "sqlite::memory:")]);
        assert!(matches!(c.datasource_platform().unwrap(), Platform::Sqlite));

        let c = configuration(&[(DB_URL, "mysql://localhost/db"), (DB_PLATFORM, "postgresql")]);
        assert!(matches!(c.datasource_platform().unwrap(), Platform::Postgresql));

        let c = configuration(&[(DB_URL, "oracle://localhost/db")]);
        assert!(c.datasource_platform().is_err());

        let c = configuration(&[]);
        assert!(c.database_url().is_err());
    }

    #[test]
    fn test_maintenance_defaults() {
        let c = configuration(&[]);
        assert_eq!(c.history_retention_days(), 30);
        assert_eq!(c.history_sweep_max_rows(), 1000);
        assert_eq!(c.history_sweep_interval_secs(), 3600);
        assert!(!c.repair_on_startup());

        let c = configuration(&[
            (HISTORY_RETENTION_DAYS, "7"),
            (HISTORY_SWEEP_MAX_ROWS, "0"),
            (REPAIR_ON_STARTUP, "true"),
        ]);
        assert_eq!(c.history_retention_days(), 7);
        assert_eq!(c.history_sweep_max_rows(), 1);
        assert!(c.repair_on_startup());
    }

    #[test]
    fn test_logging_config_from_keys() {
        let c = configuration(&[
            (LOGS_PATH, "/tmp/confstore-logs"),
            (LOGS_CONSOLE, "false"),
            (LOGS_LEVEL, "debug"),
            (LOGS_ROTATION, "hourly"),
        ]);
        let logging = c.logging_config();
        assert_eq!(logging.log_dir, PathBuf::from("/tmp/confstore-logs"));
        assert!(!logging.console_output);
        assert_eq!(logging.file_level, Level::DEBUG);
        assert!(matches!(logging.rotation, LogRotation::Hourly));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["confstore", "--db-url", "sqlite::memory:", "repair"]);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.command, Some(Command::Repair));

        let cli = Cli::parse_from(["confstore", "import", "-f", "items.yaml", "-p", "overwrite"]);
        match cli.command {
            Some(Command::Import { file, tenant, policy }) => {
                assert_eq!(file, PathBuf::from("items.yaml"));
                assert!(tenant.is_none());
                assert_eq!(policy, SameConfigPolicy::Overwrite);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["confstore"]);
        assert_eq!(cli.command.unwrap_or_default(), Command::Serve);
    }
}
