//! Configuration module for simmer.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `--config PATH` on the command line
//! 2. `SIMMER_CONFIG` environment variable (explicit path)
//! 3. `./simmer.toml` (current directory)
//! 4. The platform config directory (`~/.config/simmer/simmer.toml` on Linux)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `SIMMER_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SIMMER_SERVER_ADDR=:8080`
//! - `SIMMER_SERIAL_PATTERN=/dev/ttyUSB*`
//! - `SIMMER_LOGGING_LEVEL=debug`
//!
//! Command-line flags win over both.
//!
//! # Example
//!
//! ```rust,no_run
//! use simmer::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Listening on {}", loader.config().server.addr);
//! # Ok::<(), simmer::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{ClientConfig, Config, LogFormat, LoggingConfig, SerialConfig, ServerConfig};
