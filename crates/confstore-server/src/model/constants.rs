//! Configuration keys and defaults

pub const DB_URL: &str = "db.url";
pub const DB_PLATFORM: &str = "db.platform";

pub const DB_POOL_MAX: &str = "db.pool.config.maximumPoolSize";
pub const DB_POOL_MIN: &str = "db.pool.config.minimumPoolSize";
pub const DB_POOL_CONNECT_TIMEOUT: &str = "db.pool.config.connectionTimeout";
pub const DB_POOL_ACQUIRE_TIMEOUT: &str = "db.pool.config.initializationFailTimeout";
pub const DB_POOL_IDLE_TIMEOUT: &str = "db.pool.config.idleTimeout";
pub const DB_POOL_MAX_LIFETIME: &str = "db.pool.config.maxLifetime";
pub const DB_POOL_SQLX_LOGGING: &str = "db.pool.config.sqlxLogging";

pub const HISTORY_RETENTION_DAYS: &str = "confstore.history.retentionDays";
pub const HISTORY_SWEEP_MAX_ROWS: &str = "confstore.history.sweepMaxRows";
pub const HISTORY_SWEEP_INTERVAL_SECONDS: &str = "confstore.history.sweepIntervalSeconds";
pub const REPAIR_ON_STARTUP: &str = "confstore.repair.onStartup";

pub const LOGS_PATH: &str = "confstore.logs.path";
pub const LOGS_CONSOLE: &str = "confstore.logs.console";
pub const LOGS_FILE: &str = "confstore.logs.file";
pub const LOGS_LEVEL: &str = "confstore.logs.level";
pub const LOGS_ROTATION: &str = "confstore.logs.rotation";

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_SWEEP_MAX_ROWS: u64 = 1000;
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 3600;

/// Recorded as `src_user` for writes made by the CLI
pub const CLI_SRC_USER: &str = "confstore-cli";
