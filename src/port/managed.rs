//! The shared slot holding the current device connection.
//!
//! One relay owns the connection for reading; any number of request handlers
//! write through it concurrently. The slot is guarded by a reader/writer lock
//! where replacing the connection is the exclusive operation and an outbound
//! write is the shared one, so writers never wait on the relay's blocking
//! reads (those happen outside the lock on a local handle).

use super::error::PortError;
use super::traits::Connection;
use parking_lot::RwLock;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, trace};

/// Size of the relay's read buffer.
const RELAY_BUFFER_SIZE: usize = 256;

/// Shared handle to the current live connection, if any.
#[derive(Debug, Default)]
pub struct ManagedPort {
    slot: RwLock<Option<Arc<dyn Connection>>>,
}

impl ManagedPort {
    /// Create an empty port; writes fail with `NotConnected` until a
    /// connection is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current connection. Exclusive against `write` and itself.
    pub fn install(&self, conn: Option<Arc<dyn Connection>>) {
        let mut slot = self.slot.write();
        match &conn {
            Some(c) => debug!(device = %c.name(), "connection installed"),
            None if slot.is_some() => debug!("connection cleared"),
            None => {}
        }
        *slot = conn;
    }

    /// Equivalent to `install(None)`.
    pub fn clear(&self) {
        self.install(None);
    }

    /// Whether a connection is currently installed.
    pub fn is_connected(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Write `data` to the installed connection.
    ///
    /// Fails immediately with [`PortError::NotConnected`] when the slot is
    /// empty; never queues or retries.
    pub fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let slot = self.slot.read();
        let conn = slot.as_ref().ok_or(PortError::NotConnected)?;
        let written = conn.write_bytes(data)?;
        trace!(device = %conn.name(), bytes = written, "wrote to device");
        Ok(written)
    }

    /// Install `conn` and copy everything read from it into `sink` until the
    /// stream ends or fails. The slot is cleared before returning, whatever
    /// the outcome.
    ///
    /// Returns `Ok(())` on a clean end of stream.
    pub fn relay(&self, conn: Arc<dyn Connection>, sink: &mut dyn Write) -> Result<(), PortError> {
        self.relay_while(conn, sink, || true)
    }

    /// Like [`relay`](Self::relay), but also stops (cleanly) once
    /// `keep_going` returns false. It is polled after every read, including
    /// reads that time out without data.
    pub fn relay_while<F>(
        &self,
        conn: Arc<dyn Connection>,
        sink: &mut dyn Write,
        keep_going: F,
    ) -> Result<(), PortError>
    where
        F: Fn() -> bool,
    {
        self.install(Some(Arc::clone(&conn)));
        let result = copy_stream(conn.as_ref(), sink, keep_going);
        self.clear();
        result
    }
}

fn copy_stream<F>(conn: &dyn Connection, sink: &mut dyn Write, keep_going: F) -> Result<(), PortError>
where
    F: Fn() -> bool,
{
    let mut buffer = [0u8; RELAY_BUFFER_SIZE];
    let mut total: u64 = 0;

    while keep_going() {
        match conn.read_bytes(&mut buffer) {
            Ok(0) => {
                debug!(device = %conn.name(), bytes_relayed = total, "device stream ended");
                return Ok(());
            }
            Ok(n) => {
                sink.write_all(&buffer[..n])?;
                sink.flush()?;
                total += n as u64;
            }
            Err(e) if e.is_idle() => continue,
            Err(e) => return Err(e),
        }
    }

    debug!(device = %conn.name(), bytes_relayed = total, "relay stopped");
    Ok(())
}
