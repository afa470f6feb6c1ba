//! Configuration loading
//!
//! Values are layered with `figment`, lowest to highest precedence:
//!
//! 1. built-in defaults ([`defaults`])
//! 2. `EXPIRY_FILE_SERVER_*` environment variables
//! 3. flags given explicitly on the command line
//! 4. the config file (JSON, or TOML when the file name ends in `.toml`)
//!
//! The config file wins over flags: a value set in the file replaces the
//! flag value, set or not.
//!
//! A missing, unreadable or malformed config file is never fatal; it is
//! logged and the remaining layers apply. Empty strings, a zero port and a
//! non-positive expiry in the file count as "not set".

use expiry_sweeper::ExpiryPolicy;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Root served by the browser and walked by the sweeper.
    pub workdir: PathBuf,
    /// Where uploads are written. May be the same as `workdir`.
    pub uploaddir: PathBuf,
    /// Maximum file age in hours; `0` disables expiry.
    pub file_expiry_hours: u64,
    #[serde(with = "duration_serde::duration")]
    pub sweep_interval: Duration,
    /// Upper bound for a whole upload request body, in bytes.
    pub max_upload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workdir: PathBuf::from(DEFAULT_WORK_DIR),
            uploaddir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            file_expiry_hours: DEFAULT_FILE_EXPIRY_HOURS,
            sweep_interval: humantime::parse_duration(DEFAULT_SWEEP_INTERVAL)
                .unwrap_or(expiry_sweeper::DEFAULT_SWEEP_INTERVAL),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// Values set explicitly by a layer. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaddir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_expiry_hours: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "duration_serde::option_duration::serialize"
    )]
    pub sweep_interval: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_size: Option<usize>,
}

/// Raw shape of the config file, before "not set" values are dropped.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default, deserialize_with = "duration_serde::port::deserialize")]
    port: Option<u16>,
    #[serde(default)]
    workdir: Option<String>,
    #[serde(default)]
    uploaddir: Option<String>,
    #[serde(default)]
    file_expiry_hours: Option<i64>,
    #[serde(default, with = "duration_serde::option_duration")]
    sweep_interval: Option<Duration>,
    #[serde(default)]
    max_upload_size: Option<u64>,
}

impl FileConfig {
    fn into_overrides(self) -> ConfigOverrides {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        ConfigOverrides {
            host: non_empty(self.host),
            port: self.port,
            workdir: non_empty(self.workdir).map(PathBuf::from),
            uploaddir: non_empty(self.uploaddir).map(PathBuf::from),
            file_expiry_hours: self
                .file_expiry_hours
                .and_then(|hours| u64::try_from(hours).ok())
                .filter(|hours| *hours > 0),
            sweep_interval: self.sweep_interval.filter(|interval| !interval.is_zero()),
            max_upload_size: self
                .max_upload_size
                .and_then(|size| usize::try_from(size).ok())
                .filter(|size| *size > 0),
        }
    }
}

impl Config {
    /// Resolve the configuration from every layer.
    ///
    /// # Errors
    /// Fails only when an environment or command-line value cannot be
    /// converted to its field type; config file problems are logged instead.
    pub fn load(config_file: &Path, overrides: ConfigOverrides) -> AppResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides));

        if let Some(file_layer) = read_config_file(config_file) {
            figment = figment.merge(Serialized::defaults(file_layer));
        }

        figment
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))
    }

    /// Expiry policy derived from `file_expiry_hours`.
    #[must_use]
    pub const fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::from_hours(self.file_expiry_hours)
    }

    /// Render the resolved configuration as TOML.
    pub fn to_toml_string(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::configuration(e.to_string()))
    }
}

fn read_config_file(path: &Path) -> Option<ConfigOverrides> {
    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return None;
    }

    let figment = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Figment::from(Toml::file(path)),
        _ => Figment::from(Json::file(path)),
    };

    match figment.extract::<FileConfig>() {
        Ok(file) => {
            info!("Configuration loaded from: {}", path.display());
            Some(file.into_overrides())
        }
        Err(e) => {
            warn!(
                "Failed to load config file {}, ignoring it: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Runtime settings derived once from [`Config`] and shared read-only by the
/// web layer and the sweep scheduler.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Absolute path of the served root.
    pub work_dir: PathBuf,
    /// Absolute path uploads are written to.
    pub upload_dir: PathBuf,
    pub policy: ExpiryPolicy,
    pub sweep_interval: Duration,
    pub max_upload_size: usize,
}

impl ServerSettings {
    /// Create the work and upload directories if needed and make them absolute.
    ///
    /// # Errors
    /// Returns [`AppError::DirectorySetup`] if either directory cannot be
    /// created or resolved. Callers treat this as fatal.
    pub fn prepare(config: &Config) -> AppResult<Self> {
        let work_dir = prepare_directory(&config.workdir)?;
        let upload_dir = prepare_directory(&config.uploaddir)?;

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            work_dir,
            upload_dir,
            policy: config.expiry_policy(),
            sweep_interval: config.sweep_interval,
            max_upload_size: config.max_upload_size,
        })
    }

    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn prepare_directory(dir: &Path) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|source| AppError::DirectorySetup {
        path: dir.to_path_buf(),
        source,
    })?;

    std::path::absolute(dir).map_err(|source| AppError::DirectorySetup {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load(path: &str, overrides: ConfigOverrides) -> figment::Result<Config> {
        Config::load(Path::new(path), overrides).map_err(|e| e.to_string().into())
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = load("missing.json", ConfigOverrides::default())?;
            assert_eq!(config, Config::default());
            assert_eq!(config.port, 8080);
            assert_eq!(config.file_expiry_hours, 2);
            assert_eq!(config.sweep_interval, Duration::from_secs(60));
            assert_eq!(config.max_upload_size, 1024 * 1024 * 1024);
            Ok(())
        });
    }

    #[test]
    fn test_file_values_override_flags() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{"port": "9000", "workdir": "./files", "file_expiry_hours": 5}"#,
            )?;

            let config = load("config.json", ConfigOverrides::default())?;
            assert_eq!(config.port, 9000);
            assert_eq!(config.workdir, PathBuf::from("./files"));
            assert_eq!(config.uploaddir, PathBuf::from(DEFAULT_UPLOAD_DIR));
            assert_eq!(config.file_expiry_hours, 5);

            let overrides = ConfigOverrides {
                port: Some(7000),
                uploaddir: Some(PathBuf::from("./incoming")),
                file_expiry_hours: Some(1),
                ..ConfigOverrides::default()
            };
            let config = load("config.json", overrides)?;
            assert_eq!(config.port, 9000);
            assert_eq!(config.workdir, PathBuf::from("./files"));
            assert_eq!(config.file_expiry_hours, 5);
            assert_eq!(config.uploaddir, PathBuf::from("./incoming"));
            Ok(())
        });
    }

    #[test]
    fn test_unset_file_values_are_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{"port": "", "workdir": "", "uploaddir": "  ", "file_expiry_hours": -3}"#,
            )?;

            let config = load("config.json", ConfigOverrides::default())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json", "{ not json")?;

            let overrides = ConfigOverrides {
                host: Some("127.0.0.1".to_string()),
                ..ConfigOverrides::default()
            };
            let config = load("config.json", overrides)?;
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, DEFAULT_PORT);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_and_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "server.toml",
                "port = 9100\nsweep_interval = \"30s\"\nfile_expiry_hours = 12\n",
            )?;

            let config = load("server.toml", ConfigOverrides::default())?;
            assert_eq!(config.port, 9100);
            assert_eq!(config.sweep_interval, Duration::from_secs(30));
            assert_eq!(config.file_expiry_hours, 12);

            jail.set_env("EXPIRY_FILE_SERVER_PORT", "9200");
            jail.set_env("EXPIRY_FILE_SERVER_HOST", "127.0.0.1");
            jail.set_env("EXPIRY_FILE_SERVER_MAX_UPLOAD_SIZE", "4096");
            let config = load("server.toml", ConfigOverrides::default())?;
            assert_eq!(config.port, 9100);
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.max_upload_size, 4096);

            let overrides = ConfigOverrides {
                host: Some("10.0.0.1".to_string()),
                ..ConfigOverrides::default()
            };
            let config = load("server.toml", overrides)?;
            assert_eq!(config.host, "10.0.0.1");
            assert_eq!(config.max_upload_size, 4096);
            Ok(())
        });
    }

    #[test]
    fn test_toml_rendering() {
        let rendered = Config::default().to_toml_string().unwrap();
        assert!(rendered.contains("port = 8080"));
        assert!(rendered.contains("sweep_interval = \"1m\""));
    }

    #[test]
    fn test_prepare_creates_absolute_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config {
            workdir: temp_dir.path().join("work"),
            uploaddir: temp_dir.path().join("work/incoming"),
            ..Config::default()
        };

        let settings = ServerSettings::prepare(&config).unwrap();
        assert!(settings.work_dir.is_absolute());
        assert!(settings.work_dir.is_dir());
        assert!(settings.upload_dir.is_dir());
        assert_eq!(settings.policy, ExpiryPolicy::from_hours(2));
        assert_eq!(settings.listen_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_prepare_fails_when_path_is_a_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("occupied");
        std::fs::write(&blocker, "not a directory").unwrap();

        let config = Config {
            workdir: blocker,
            ..Config::default()
        };
        let err = ServerSettings::prepare(&config).unwrap_err();
        assert!(matches!(err, AppError::DirectorySetup { .. }));
    }
}
