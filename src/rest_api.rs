//! HTTP surface of the bridge.
//!
//! `POST /` takes fields `command` and `value` and writes the encoded
//! command to the device. Fields may arrive as a urlencoded body or in the
//! query string; body fields win, and the first occurrence of a repeated
//! field is used. `GET /health` reports whether a device is currently
//! connected.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Form, Query, State as AxumState,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    command::{Command, CommandError},
    error::{AppError, AppResult},
    port::ManagedPort,
};

/// Raw `key=value` pairs in request order.
type FormPairs = Vec<(String, String)>;

#[derive(Clone)]
pub struct RestContext {
    pub port: Arc<ManagedPort>,
}

impl RestContext {
    pub fn new(port: Arc<ManagedPort>) -> Self {
        Self { port }
    }
}

/// Fields of a control request. Both are optional here so that missing ones
/// become a 400 from our own validation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandForm {
    pub command: Option<String>,
    pub value: Option<String>,
}

impl CommandForm {
    /// Collect the known fields, keeping the first value seen for each.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();
        for (key, val) in pairs {
            let slot = match key.as_str() {
                "command" => &mut form.command,
                "value" => &mut form.value,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(val);
            }
        }
        form
    }
}

pub fn build_router(ctx: RestContext) -> Router {
    Router::new()
        .route("/", post(handle_command))
        .route("/health", get(health))
        .with_state(ctx)
}

async fn health(AxumState(ctx): AxumState<RestContext>) -> Json<Value> {
    Json(json!({"status": "ok", "connected": ctx.port.is_connected()}))
}

/// Body pairs, or none when the body is not a form at all.
fn body_pairs(body: Result<Form<FormPairs>, FormRejection>) -> Result<FormPairs, CommandError> {
    match body {
        Ok(Form(pairs)) => Ok(pairs),
        Err(FormRejection::InvalidFormContentType(_)) => Ok(Vec::new()),
        Err(rejection) => Err(CommandError::MalformedRequest(rejection.body_text())),
    }
}

fn request_form(
    query: Result<Query<FormPairs>, QueryRejection>,
    body: Result<Form<FormPairs>, FormRejection>,
) -> Result<CommandForm, CommandError> {
    let Query(query) = query.map_err(|e| CommandError::MalformedRequest(e.body_text()))?;
    let body = body_pairs(body)?;
    Ok(CommandForm::from_pairs(body.into_iter().chain(query)))
}

async fn handle_command(
    AxumState(ctx): AxumState<RestContext>,
    query: Result<Query<FormPairs>, QueryRejection>,
    body: Result<Form<FormPairs>, FormRejection>,
) -> AppResult<Json<Value>> {
    let command = request_form(query, body)
        .and_then(|form| Command::parse(form.command.as_deref(), form.value.as_deref()))
        .map_err(|e| {
            warn!(error = %e, "rejected command");
            AppError::from(e)
        })?;

    let bytes = command.encode();
    let port = Arc::clone(&ctx.port);
    let written = tokio::task::spawn_blocking(move || port.write(&bytes))
        .await?
        .map_err(|e| {
            warn!(command = command.name(), error = %e, "device write failed");
            AppError::from(e)
        })?;

    info!(command = command.name(), ?bytes, "command written");
    Ok(Json(json!({"status": "ok", "bytes_written": written})))
}
