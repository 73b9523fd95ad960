use serde_json::json;

use super::{api_err, backend, required_str};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::model::Student;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "students.promote" => Some(handle_promote(state, req)),
        _ => None,
    }
}

fn handle_list(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let admission_type = req
        .params
        .get("admissionType")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty());
    let students = match api.list_students(admission_type) {
        Ok(students) => students,
        Err(e) => return api_err(req, e),
    };

    let needle = req
        .params
        .get("search")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let kept: Vec<&Student> = students
        .iter()
        .filter(|student| needle.is_empty() || matches_search(student, &needle))
        .collect();

    ok(&req.id, json!({ "students": kept }))
}

fn matches_search(student: &Student, needle: &str) -> bool {
    [
        student.first_name.as_deref(),
        student.last_name.as_deref(),
        student.enrollment_number.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

fn handle_get(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match api.get_student(&student_id) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => api_err(req, e),
    }
}

fn handle_delete(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match api.delete_student(&student_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => api_err(req, e),
    }
}

fn handle_promote(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match api.promote_student(&student_id) {
        Ok(outcome) => ok(
            &req.id,
            json!({
                "message": outcome
                    .message
                    .unwrap_or_else(|| "Student promoted successfully".to_string()),
            }),
        ),
        Err(e) => api_err(req, e),
    }
}
