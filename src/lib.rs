//! Simmer library
//!
//! Bridges one serial-attached controller to HTTP: the device's output is
//! relayed to stdout through a connection that reconnects on its own, and
//! set-point commands arriving over HTTP are written to whatever connection
//! is live at the time.
//!
//! # Modules
//!
//! - `port`: the `Connection` abstraction, serial/mock implementations and
//!   `ManagedPort`, the shared connection slot
//! - `reconnect`: the open/relay/backoff supervisor
//! - `command`: command validation and wire encoding
//! - `discovery`: device path resolution
//! - `rest_api`: HTTP handlers
//! - `server`: wiring for the `server` subcommand
//! - `client`: the `set-temp` client
//! - `config`: configuration management with TOML support
//! - `logging`: tracing subscriber setup
//! - `error`: HTTP-facing errors

pub mod client;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod port;
pub mod reconnect;
pub mod rest_api;
pub mod server;

pub use command::{Command, CommandError, ControlValue};
pub use error::{AppError, AppResult};
pub use port::{
    Connection, ConnectionConfig, Connector, ManagedPort, MockConnection, PortError,
    ScriptedConnector, SerialConnection, SerialConnector,
};
pub use reconnect::{retry_delay, Attempt, ReconnectLoop, RetryState, ShutdownSignal};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
