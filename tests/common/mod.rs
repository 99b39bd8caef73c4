//! Shared test utilities for simmer integration tests.
//!
//! Provides an in-process bridge (reconnect loop + HTTP endpoint) wired to
//! scripted mock devices, plus a capturing sink for the relayed stream.

#![allow(dead_code)]

use serde_json::Value;
use simmer::port::{ManagedPort, ScriptedConnector};
use simmer::reconnect::{ReconnectLoop, ShutdownSignal};
use simmer::rest_api::{build_router, RestContext};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// A `Write` sink whose contents can be inspected from the test thread.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// A running bridge on an ephemeral localhost port.
pub struct TestBridge {
    pub addr: SocketAddr,
    pub port: Arc<ManagedPort>,
    pub output: SharedSink,
    pub connector: ScriptedConnector,
    shutdown: ShutdownSignal,
    supervisor: Option<JoinHandle<()>>,
}

impl TestBridge {
    pub async fn start(connector: ScriptedConnector) -> Self {
        let port = Arc::new(ManagedPort::new());
        let output = SharedSink::default();

        let supervisor = ReconnectLoop::new(
            connector.clone(),
            Arc::clone(&port),
            Box::new(output.clone()),
        );
        let shutdown = supervisor.shutdown_signal();
        let handle = supervisor.spawn().expect("Failed to spawn reconnect loop");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        let app = build_router(RestContext::new(Arc::clone(&port)));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            addr,
            port,
            output,
            connector,
            shutdown,
            supervisor: Some(handle),
        }
    }

    pub fn addr_string(&self) -> String {
        self.addr.to_string()
    }

    /// POST a form to `/` and return the status and decoded JSON body.
    pub async fn post_form(&self, fields: &[(&str, &str)]) -> (u16, Value) {
        let url = format!("http://{}/", self.addr);
        let fields: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        tokio::task::spawn_blocking(move || {
            let response = reqwest::blocking::Client::new()
                .post(url)
                .form(&fields)
                .send()
                .expect("Request failed");
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            (status, serde_json::from_str(&body).unwrap_or(Value::Null))
        })
        .await
        .unwrap()
    }

    /// POST an arbitrary body to `path` (which may carry a query string).
    pub async fn post_raw(
        &self,
        path: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (u16, Value) {
        let url = format!("http://{}{}", self.addr, path);
        let content_type = content_type.map(str::to_string);
        let body = body.to_string();

        tokio::task::spawn_blocking(move || {
            let mut request = reqwest::blocking::Client::new().post(url).body(body);
            if let Some(content_type) = content_type {
                request = request.header("content-type", content_type);
            }
            let response = request.send().expect("Request failed");
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            (status, serde_json::from_str(&body).unwrap_or(Value::Null))
        })
        .await
        .unwrap()
    }

    pub async fn health(&self) -> Value {
        let url = format!("http://{}/health", self.addr);
        tokio::task::spawn_blocking(move || {
            let body = reqwest::blocking::get(url)
                .expect("Request failed")
                .text()
                .unwrap();
            serde_json::from_str(&body).unwrap()
        })
        .await
        .unwrap()
    }

    pub async fn wait_connected(&self, connected: bool) -> bool {
        let port = Arc::clone(&self.port);
        eventually(Duration::from_secs(5), move || port.is_connected() == connected).await
    }

    /// Stop the reconnect loop and wait for it to exit.
    pub fn stop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.supervisor.take() {
            handle.join().expect("reconnect thread panicked");
        }
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
