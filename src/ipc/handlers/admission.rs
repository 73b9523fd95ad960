use serde_json::json;

use super::{api_err, backend};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Fields the intake form cannot submit without.
const REQUIRED_FIELDS: [&str; 9] = [
    "firstName",
    "lastName",
    "mobileNumber",
    "gender",
    "casteCategory",
    "stream",
    "department",
    "semester",
    "admissionType",
];

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admission.submit" => Some(handle_submit(state, req)),
        _ => None,
    }
}

/// Create a student, or update one when `studentId` is present. The form is
/// validated before any request goes out.
fn handle_submit(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let Some(form) = req.params.get("student").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing params.student", None);
    };

    if let Some(field) = missing_required_field(form) {
        return err(
            &req.id,
            "validation_failed",
            format!("please fill out the {} field", field),
            Some(json!({ "field": field })),
        );
    }

    let student_id = req.params.get("studentId").and_then(|v| v.as_str());
    let saved = match student_id {
        Some(id) => api.update_student(id, form),
        None => api.create_student(form),
    };
    match saved {
        Ok(body) => ok(
            &req.id,
            json!({ "updated": student_id.is_some(), "student": body }),
        ),
        Err(e) => api_err(req, e),
    }
}

fn missing_required_field(form: &serde_json::Value) -> Option<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .find(|field| !filled(form.get(field)))
}

fn filled(value: Option<&serde_json::Value>) -> bool {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .map_or(false, |v| !v.is_empty())
}
