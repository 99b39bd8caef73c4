//! `server` subcommand: discover the device, supervise it on a background
//! thread, and serve the control endpoint until ctrl-c / SIGTERM.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::discovery::{self, DiscoveryError};
use crate::port::{ConnectionConfig, ManagedPort, SerialConnector};
use crate::reconnect::{ReconnectLoop, ShutdownSignal};
use crate::rest_api::{build_router, RestContext};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start reconnect thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the server needs, already merged from config and flags.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub device: Option<String>,
    pub pattern: String,
    pub addr: String,
    pub read_timeout: Duration,
}

/// Expand a bare `:PORT` listen address: `:6077` binds every interface.
pub fn listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

pub async fn run(opts: ServerOptions) -> Result<(), ServerError> {
    let path = discovery::find_device(opts.device.as_deref(), &opts.pattern)?;
    info!(device = %path.display(), "using device");

    let config = ConnectionConfig::new(path).with_read_timeout(opts.read_timeout);
    let port = Arc::new(ManagedPort::new());
    let shutdown = ShutdownSignal::new();

    let supervisor = ReconnectLoop::new(
        SerialConnector::new(config),
        Arc::clone(&port),
        Box::new(std::io::stdout()),
    )
    .with_shutdown(shutdown.clone());
    let handle = supervisor.spawn().map_err(ServerError::Spawn)?;

    let addr = listen_addr(&opts.addr);
    let listener = match TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(source) => {
            stop_supervisor(&shutdown, handle).await;
            return Err(ServerError::Bind { addr, source });
        }
    };
    info!(addr = %listener.local_addr()?, "control endpoint listening");

    let app = build_router(RestContext::new(port));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    stop_supervisor(&shutdown, handle).await;
    served.map_err(ServerError::from)
}

/// Raise shutdown and wait for the reconnect thread to clear the slot and exit.
async fn stop_supervisor(shutdown: &ShutdownSignal, handle: JoinHandle<()>) {
    shutdown.trigger();
    let joined = tokio::task::spawn_blocking(move || handle.join()).await;
    if !matches!(joined, Ok(Ok(()))) {
        error!("reconnect thread panicked");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, shutting down");
}
