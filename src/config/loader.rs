//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SIMMER";

/// Config file name
const CONFIG_FILE_NAME: &str = "simmer.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SIMMER_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SIMMER_CONFIG` environment variable (explicit path)
    /// 2. `./simmer.toml` (current directory)
    /// 3. the platform config directory, e.g. `~/.config/simmer/simmer.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() || validate(&config).is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

/// Get the default config file path for this platform.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "simmer").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&var).ok().map(|val| (var, val))
}

fn parse_env<T: FromStr>(var: &str, val: &str, what: &str) -> ConfigResult<T> {
    val.parse()
        .map_err(|_| ConfigError::env_parse(var, format!("Invalid {}", what)))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SIMMER_<SECTION>_<KEY>`
/// For example:
/// - `SIMMER_SERVER_ADDR=:8080`
/// - `SIMMER_SERIAL_DEVICE=ttyACM0`
/// - `SIMMER_LOGGING_FORMAT=json`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, val)) = env_var("SERVER_ADDR") {
        config.server.addr = val;
    }

    if let Some((_, val)) = env_var("CLIENT_ADDR") {
        config.client.addr = val;
    }
    if let Some((var, val)) = env_var("CLIENT_TIMEOUT_MS") {
        config.client.timeout_ms = parse_env(&var, &val, "timeout")?;
    }

    if let Some((_, val)) = env_var("SERIAL_DEVICE") {
        config.serial.device = Some(val).filter(|v| !v.is_empty());
    }
    if let Some((_, val)) = env_var("SERIAL_PATTERN") {
        config.serial.pattern = val;
    }
    if let Some((var, val)) = env_var("SERIAL_READ_TIMEOUT_MS") {
        config.serial.read_timeout_ms = parse_env(&var, &val, "timeout")?;
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => return Err(ConfigError::env_parse(var, "Expected json, pretty or compact")),
        };
    }

    Ok(())
}

fn validate(config: &Config) -> ConfigResult<()> {
    if config.serial.read_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "serial.read_timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.client.timeout_ms == 0 {
        return Err(ConfigError::validation(
            "client.timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.server.addr.trim().is_empty() {
        return Err(ConfigError::validation("server.addr", "must not be empty"));
    }
    if config.serial.pattern.trim().is_empty() {
        return Err(ConfigError::validation("serial.pattern", "must not be empty"));
    }
    Ok(())
}
