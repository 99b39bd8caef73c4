//! Serial device connection.
//!
//! Wraps the `serialport` crate behind the `Connection` trait. The port is
//! split with `try_clone` into a read half and a write half so the relay's
//! blocking read never holds up a writer.

use super::error::PortError;
use super::traits::{Connection, ConnectionConfig, Connector};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// A live serial connection opened with [`ConnectionConfig`].
pub struct SerialConnection {
    reader: Mutex<Box<dyn serialport::SerialPort>>,
    /// Serialises concurrent writers so each command reaches the wire whole.
    writer: Mutex<Box<dyn serialport::SerialPort>>,
    name: String,
}

impl SerialConnection {
    /// Open the device described by `config` (8N1, no flow control).
    ///
    /// # Example
    /// ```no_run
    /// use simmer::port::{ConnectionConfig, SerialConnection};
    ///
    /// let conn = SerialConnection::open(&ConnectionConfig::new("/dev/ttyACM0"))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &ConnectionConfig) -> Result<Self, PortError> {
        let port_name = config.path.to_string_lossy().into_owned();
        let reader = serialport::new(port_name.as_str(), config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name.as_str()),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;
        let writer = reader.try_clone()?;

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            name: port_name,
        })
    }
}

impl Connection for SerialConnection {
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.reader.lock().read(buffer).map_err(PortError::Io)
    }

    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut writer = self.writer.lock();
        writer.write_all(data)?;
        writer.flush()?;
        Ok(data.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialConnection")
            .field("name", &self.name)
            .finish()
    }
}

/// Opens [`SerialConnection`]s for the reconnect loop.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: ConnectionConfig,
}

impl SerialConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self) -> Result<Arc<dyn Connection>, PortError> {
        let conn = SerialConnection::open(&self.config)?;
        debug!(device = %conn.name(), baud = self.config.baud_rate, "serial port opened");
        Ok(Arc::new(conn))
    }
}
