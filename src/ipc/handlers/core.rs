use serde_json::json;

use crate::api::ApiClient;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "backend.connect" => Some(handle_connect(state, req)),
        _ => None,
    }
}

fn handle_health(state: &AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "backendUrl": state.backend.as_ref().map(|api| api.base_url().to_string()),
        }),
    )
}

/// Point the daemon at a backend. The bearer token may come inline or from
/// the CAMPUSD_TOKEN environment variable. Any open review belongs to the
/// previous backend and is dropped.
fn handle_connect(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(base_url) = req.params.get("baseUrl").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.baseUrl", None);
    };
    let token = req
        .params
        .get("token")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| std::env::var("CAMPUSD_TOKEN").ok());

    match ApiClient::new(base_url, token) {
        Ok(client) => {
            tracing::info!(backend = base_url, "connected to backend");
            state.backend = Some(client);
            state.review = None;
            ok(&req.id, json!({ "backendUrl": base_url }))
        }
        Err(e) => err(&req.id, "backend_connect_failed", e.to_string(), None),
    }
}
