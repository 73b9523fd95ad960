use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use serde_json::json;

use super::{backend, required_str};
use crate::api::ApiError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "certificates.generate" => Some(handle_generate(state, req)),
        _ => None,
    }
}

/// Generate a transfer (TC) or leaving (LC) certificate and save the PDF the
/// backend renders as `<outputDir>/<type>_<studentId>.pdf`.
fn handle_generate(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let cert_type = match req.params.get("type").and_then(|v| v.as_str()) {
        Some("TC") => "TC",
        Some("LC") => "LC",
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                "type must be TC or LC",
                Some(json!({ "type": other })),
            )
        }
        None => return err(&req.id, "bad_params", "missing type", None),
    };
    let output_dir = match required_str(req, "outputDir") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let reason = req
        .params
        .get("reason")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    if reason.is_empty() {
        return err(&req.id, "validation_failed", "reason is required", None);
    }

    // An omitted leaving date defaults to today; an explicitly blank one is
    // a caller mistake.
    let leaving_date = match req.params.get("leavingDate").and_then(|v| v.as_str()) {
        Some("") => return err(&req.id, "validation_failed", "leaving date is required", None),
        Some(date) => date.to_string(),
        None => Local::now().date_naive().to_string(),
    };

    let is_cleared = req
        .params
        .get("isCleared")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let completion_status = req
        .params
        .get("completionStatus")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty());
    if cert_type == "LC" && completion_status.is_none() {
        return err(
            &req.id,
            "validation_failed",
            "completion status is required for a leaving certificate",
            None,
        );
    }

    let mut body = json!({
        "type": cert_type,
        "reason": reason,
        "leavingDate": leaving_date,
        "isCleared": is_cleared,
    });
    if let Some(completion_status) = completion_status {
        if cert_type == "LC" {
            body["completionStatus"] = json!(completion_status);
        }
    }

    let bytes = match api.generate_certificate(&student_id, &body) {
        Ok(bytes) => bytes,
        Err(e) => return err(&req.id, "certificate_failed", failure_message(&e), None),
    };

    let path = PathBuf::from(&output_dir).join(format!("{}_{}.pdf", cert_type, student_id));
    if let Err(e) = save_certificate(&path, &bytes) {
        return err(&req.id, "write_failed", format!("{:#}", e), None);
    }

    ok(
        &req.id,
        json!({
            "type": cert_type,
            "path": path.to_string_lossy(),
            "bytes": bytes.len(),
        }),
    )
}

/// Origin-specific wording: a 400 carries the backend's own explanation,
/// 404 and 500 get fixed texts, anything else a generic one.
fn failure_message(error: &ApiError) -> String {
    match error {
        ApiError::Status { status: 404, .. } => {
            "certificate generation endpoint not found; contact the administrator".to_string()
        }
        ApiError::Status { status: 400, message } => message.clone(),
        ApiError::Status { status: 500, .. } => {
            "server error while generating the certificate; try again later".to_string()
        }
        _ => "failed to generate certificate; please try again".to_string(),
    }
}

fn save_certificate(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output folder {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("write certificate {}", path.display()))?;
    Ok(())
}
