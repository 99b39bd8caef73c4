//! Reconnect supervisor for the device connection.
//!
//! Keeps trying to open the device; on success relays its output into the
//! sink until the stream ends or fails, then starts over. Failed opens back
//! off according to [`retry_delay`]. The loop runs on its own thread and
//! only stops when its [`ShutdownSignal`] is raised.
//!
//! ```text
//!            open ok (attempts = 0)
//! Disconnected ────────────────────► Connected (inside relay)
//!   ▲   │ open failed:                   │
//!   │   │ wait retry_delay(n), n += 1    │ relay returned (EOF or error)
//!   └───┘                                │
//!   ▲────────────────────────────────────┘
//! ```

use crate::port::{Connector, ManagedPort, PortError};
use parking_lot::{Condvar, Mutex};
use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff before the next open attempt, given how many consecutive opens
/// have already failed.
pub fn retry_delay(attempts: u32) -> Duration {
    match attempts {
        0..=2 => Duration::ZERO,
        3..=5 => Duration::from_millis(200),
        6..=10 => Duration::from_secs(1),
        _ => Duration::from_secs(5),
    }
}

/// Consecutive failed opens since the last successful one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
}

impl RetryState {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay to apply for the failure being recorded now, then count it.
    pub fn record_failure(&mut self) -> Duration {
        let delay = retry_delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// One-shot, cloneable stop flag that sleeping threads can wait on.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock() = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for up to `timeout`, waking early on shutdown.
    /// Returns true if shutdown has been requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let mut triggered = flag.lock();
        if !*triggered && !timeout.is_zero() {
            cvar.wait_while_for(&mut triggered, |t| !*t, timeout);
        }
        *triggered
    }
}

/// Result of a single pass through the state machine.
#[derive(Debug)]
pub enum Attempt {
    /// The open succeeded and the relay has since returned.
    Relayed(Result<(), PortError>),
    /// The open failed; `delay` is the pause owed before the next attempt.
    Failed { error: PortError, delay: Duration },
}

/// Supervises a [`ManagedPort`], (re)opening connections through a
/// [`Connector`] and relaying their output to `sink`.
pub struct ReconnectLoop<C> {
    connector: C,
    port: Arc<ManagedPort>,
    sink: Box<dyn Write + Send>,
    retry: RetryState,
    shutdown: ShutdownSignal,
}

impl<C: Connector> ReconnectLoop<C> {
    pub fn new(connector: C, port: Arc<ManagedPort>, sink: Box<dyn Write + Send>) -> Self {
        Self {
            connector,
            port,
            sink,
            retry: RetryState::default(),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Use an externally owned shutdown signal.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn retry_state(&self) -> RetryState {
        self.retry
    }

    /// Try to open once. On success the counter is reset and this call
    /// blocks inside the relay until the connection goes away.
    pub fn attempt(&mut self) -> Attempt {
        match self.connector.connect() {
            Ok(conn) => {
                if self.retry.attempts() > 0 {
                    info!(
                        device = %conn.name(),
                        failed_attempts = self.retry.attempts(),
                        "device connected"
                    );
                } else {
                    info!(device = %conn.name(), "device connected");
                }
                self.retry.reset();

                let shutdown = &self.shutdown;
                let result = self
                    .port
                    .relay_while(conn, self.sink.as_mut(), || !shutdown.is_triggered());
                match &result {
                    Ok(()) => info!("device stream closed"),
                    Err(e) => warn!(error = %e, "device stream failed"),
                }
                Attempt::Relayed(result)
            }
            Err(error) => {
                let attempts = self.retry.attempts();
                let delay = self.retry.record_failure();
                if attempts == 0 {
                    warn!(error = %error, "device unavailable, retrying");
                } else {
                    debug!(error = %error, attempts, ?delay, "open failed");
                }
                Attempt::Failed { error, delay }
            }
        }
    }

    /// Run until shutdown. Open failures and relay terminations are never
    /// fatal.
    pub fn run(mut self) {
        while !self.shutdown.is_triggered() {
            if let Attempt::Failed { delay, .. } = self.attempt() {
                if self.shutdown.wait_timeout(delay) {
                    break;
                }
            }
        }
        self.port.clear();
        info!("reconnect loop stopped");
    }
}

impl<C: Connector + 'static> ReconnectLoop<C> {
    /// Run the loop on a dedicated named thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("reconnect".into())
            .spawn(move || self.run())
    }
}
