pub mod admission;
pub mod backlog;
pub mod certificate;
pub mod core;
pub mod reference;
pub mod roster;
pub mod summary;

use crate::api::{ApiClient, ApiError};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub(crate) fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub(crate) fn backend<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a ApiClient, serde_json::Value> {
    state
        .backend
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_backend", "connect to a backend first", None))
}

pub(crate) fn api_err(req: &Request, error: ApiError) -> serde_json::Value {
    err(&req.id, "api_request_failed", error.to_string(), None)
}
