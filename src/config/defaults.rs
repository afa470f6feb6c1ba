/// Configuration default values
///
/// Every layer above the built-in defaults (config file, environment,
/// command line) starts from these.

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 * 1024 * 1024; // 1GiB

// Storage defaults
pub const DEFAULT_WORK_DIR: &str = "./uploads";
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

// Expiry defaults
pub const DEFAULT_FILE_EXPIRY_HOURS: u64 = 2;
pub const DEFAULT_SWEEP_INTERVAL: &str = "1m";

// Sources
pub const DEFAULT_CONFIG_FILE: &str = "./config.json";
pub const ENV_PREFIX: &str = "EXPIRY_FILE_SERVER_";
