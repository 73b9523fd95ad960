use serde_json::json;

use super::{api_err, backend};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::summary::{enrollment_summary, overview_summary};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "summary.enrollment" => Some(handle_enrollment(state, req)),
        "summary.overview" => Some(handle_overview(state, req)),
        _ => None,
    }
}

/// Enrollment dashboard: grouped counts over the whole roster plus the
/// month-by-month admission breakdown.
fn handle_enrollment(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let students = match api.list_students(None) {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let castes = match api.castes() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let departments = match api.departments() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let streams = match api.streams() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };

    let summary = enrollment_summary(&students, &castes, &departments, &streams);
    ok(&req.id, json!(summary))
}

/// Institution overview: totals and by-department / by-stream groupings,
/// with the faculty list optionally narrowed to one role.
fn handle_overview(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let role = req
        .params
        .get("facultyRole")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .unwrap_or("All");

    let students = match api.all_students() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let faculties = match api.faculties(role) {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let departments = match api.departments() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let streams = match api.streams() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };

    let summary = overview_summary(&students, &faculties, &departments, &streams);
    ok(&req.id, json!(summary))
}
