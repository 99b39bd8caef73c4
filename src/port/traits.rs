//! Core traits for the device connection.
//!
//! `Connection` lets the real serial port and the test mock be used
//! interchangeably by `ManagedPort`; `Connector` does the same for the
//! open step driven by the reconnect loop.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The controller firmware only speaks 9600 baud.
pub const BAUD_RATE: u32 = 9600;

/// Default read poll interval; bounds how long shutdown waits on a quiet device.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Everything needed to (re)open the device. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Path of the serial device, e.g. `/dev/tty.usbmodem1411`.
    pub path: PathBuf,

    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// How long a single read may block before it reports "no data yet".
    pub read_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// An open, bidirectional, closable byte stream to the device.
///
/// Both methods take `&self`: the relay reads while request handlers write
/// through the same shared handle, so implementations provide their own
/// interior synchronisation. Dropping the last handle closes the stream.
pub trait Connection: Send + Sync + std::fmt::Debug {
    /// Read bytes into `buffer`. `Ok(0)` means end of stream.
    ///
    /// A timeout with no data is reported as an error for which
    /// [`PortError::is_idle`] is true.
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write bytes to the device, returning how many were written.
    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Name/path of the underlying device.
    fn name(&self) -> &str;
}

/// Opens fresh connections on demand.
pub trait Connector: Send {
    fn connect(&mut self) -> Result<Arc<dyn Connection>, PortError>;
}
