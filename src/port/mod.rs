//! Port abstraction layer for the device connection.
//!
//! Provides the `Connection`/`Connector` traits, the serial implementation,
//! mocks for testing, and `ManagedPort`, the shared slot the relay and the
//! request handlers meet at.

pub mod error;
pub mod managed;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::PortError;
pub use managed::ManagedPort;
pub use mock::{ConnectOutcome, MockConnection, ScriptedConnector};
pub use serial::{SerialConnection, SerialConnector};
pub use traits::*;
