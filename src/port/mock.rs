//! Mock connection implementation for testing.
//!
//! Provides a `MockConnection` that simulates the device without hardware,
//! and a `ScriptedConnector` that hands out a pre-programmed sequence of open
//! outcomes to the reconnect loop.

use super::error::PortError;
use super::traits::{Connection, Connector};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Poll interval used while a held-open mock has nothing to return.
const IDLE_POLL: Duration = Duration::from_millis(5);

#[derive(Debug)]
enum ReadStep {
    Data(Vec<u8>),
    Fail(ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    /// Scripted results for read operations, consumed front to back.
    reads: VecDeque<ReadStep>,
    /// Log of all writes accepted by the connection.
    write_log: Vec<Vec<u8>>,
    /// When set, every write fails with this kind.
    write_failure: Option<ErrorKind>,
    /// Keep reporting idle timeouts once the script is drained, instead of EOF.
    hold_open: bool,
    /// Set by `disconnect()`; a held-open mock then reports EOF.
    disconnected: bool,
}

/// Mock device connection for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the other is installed in a `ManagedPort`.
///
/// # Example
/// ```
/// use simmer::port::{Connection, MockConnection};
///
/// let port = MockConnection::new("MOCK0");
/// port.enqueue_read(b"21.5\n");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"21.5\n");
/// // Script drained: end of stream.
/// assert_eq!(port.read_bytes(&mut buffer).unwrap(), 0);
///
/// port.write_bytes(&[0x01, 0xF4]).unwrap();
/// assert_eq!(port.write_log(), vec![vec![0x01, 0xF4]]);
/// ```
#[derive(Clone)]
pub struct MockConnection {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    /// Create a mock that reports end of stream once its read script is drained.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a mock that stays open (reporting idle timeouts) until
    /// [`disconnect`](Self::disconnect) is called.
    pub fn held_open(name: impl Into<String>) -> Self {
        let mock = Self::new(name);
        mock.state.lock().hold_open = true;
        mock
    }

    /// Queue a chunk to be returned by a subsequent read.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().reads.push_back(ReadStep::Data(data.to_vec()));
    }

    /// Queue a read failure; the relay treats anything but a timeout as fatal.
    pub fn enqueue_read_error(&self, kind: ErrorKind) {
        self.state.lock().reads.push_back(ReadStep::Fail(kind));
    }

    /// Make every subsequent write fail with `kind`.
    pub fn fail_writes(&self, kind: ErrorKind) {
        self.state.lock().write_failure = Some(kind);
    }

    /// Simulate the device going away: a held-open mock now reports EOF.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    /// Get a copy of all data written to the connection.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of scripted reads not yet consumed.
    pub fn pending_reads(&self) -> usize {
        self.state.lock().reads.len()
    }
}

impl Connection for MockConnection {
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        match state.reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    // Remainder goes back to the front for the next read.
                    state.reads.push_front(ReadStep::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(ReadStep::Fail(kind)) => Err(PortError::Io(kind.into())),
            None if state.hold_open && !state.disconnected => {
                drop(state);
                std::thread::sleep(IDLE_POLL);
                Err(PortError::timeout(IDLE_POLL))
            }
            None => Ok(0),
        }
    }

    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if let Some(kind) = state.write_failure {
            return Err(PortError::Io(kind.into()));
        }

        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("name", &self.name)
            .field("pending_reads", &self.pending_reads())
            .finish()
    }
}

/// Outcome of one scripted open attempt.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Fail,
    Open(MockConnection),
}

/// A `Connector` that replays a fixed sequence of outcomes and then fails
/// forever, as if the device were unplugged.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<ConnectOutcome>>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` failed opens.
    pub fn fail_times(self, count: usize) -> Self {
        self.script
            .lock()
            .extend(std::iter::repeat(ConnectOutcome::Fail).take(count));
        self
    }

    /// Append a successful open that hands out `conn`.
    pub fn then_open(self, conn: MockConnection) -> Self {
        self.script.lock().push_back(ConnectOutcome::Open(conn));
        self
    }

    /// Total number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn connect(&mut self) -> Result<Arc<dyn Connection>, PortError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(ConnectOutcome::Open(conn)) => Ok(Arc::new(conn)),
            Some(ConnectOutcome::Fail) | None => Err(PortError::not_found("MOCK")),
        }
    }
}
