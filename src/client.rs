//! Client side of the `set-temp` subcommand.

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::command::{CommandError, ControlValue, SET_TEMP};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status code: {code}{}", detail_suffix(.detail))]
    Status { code: u16, detail: Option<String> },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

/// Base URL for a server address. A bare `:PORT` means this host.
pub fn server_url(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("http://localhost{addr}/")
    } else {
        format!("http://{addr}/")
    }
}

/// Validate `value` and post it to the bridge at `addr`.
///
/// The value is checked locally first so a typo never reaches the device.
pub fn send_set_temp(addr: &str, value: &str, timeout: Duration) -> Result<ControlValue, ClientError> {
    let target: ControlValue = value.parse()?;
    let url = server_url(addr);
    debug!(%url, value = %target, "posting set-temp");

    let value = target.to_string();
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let response = client
        .post(&url)
        .form(&[("command", SET_TEMP), ("value", value.as_str())])
        .send()?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let detail = response
            .text()
            .ok()
            .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string));
        return Err(ClientError::Status {
            code: status.as_u16(),
            detail,
        });
    }

    Ok(target)
}
