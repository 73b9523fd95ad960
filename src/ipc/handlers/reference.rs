use serde_json::json;

use super::{api_err, backend, required_str};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::model::{Department, Stream, Subject};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reference.streams" => Some(handle_streams(state, req)),
        "reference.departments" => Some(handle_departments(state, req)),
        "reference.semesters" => Some(handle_semesters(state, req)),
        "reference.subjects" => Some(handle_subjects(state, req)),
        "reference.castes" => Some(handle_castes(state, req)),
        "reference.semesterSubjects" => Some(handle_semester_subjects(state, req)),
        "reference.catalog" => Some(handle_catalog(state, req)),
        _ => None,
    }
}

fn handle_streams(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    match api.streams() {
        Ok(streams) => ok(&req.id, json!({ "streams": streams })),
        Err(e) => api_err(req, e),
    }
}

fn handle_departments(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    match api.departments() {
        Ok(departments) => ok(&req.id, json!({ "departments": departments })),
        Err(e) => api_err(req, e),
    }
}

fn handle_semesters(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    match api.semesters() {
        Ok(semesters) => ok(&req.id, json!({ "semesters": semesters })),
        Err(e) => api_err(req, e),
    }
}

fn handle_subjects(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    match api.subjects() {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => api_err(req, e),
    }
}

fn handle_castes(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    match api.castes() {
        Ok(castes) => ok(&req.id, json!({ "castes": castes })),
        Err(e) => api_err(req, e),
    }
}

fn handle_semester_subjects(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let semester_id = match required_str(req, "semesterId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let department_id = match required_str(req, "departmentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match api.semester_subjects(&semester_id, &department_id) {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => api_err(req, e),
    }
}

/// The intake form's combined lookup: every stream with its departments,
/// every department with its subjects.
fn handle_catalog(state: &AppState, req: &Request) -> serde_json::Value {
    let api = match backend(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let streams = match api.streams() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let departments = match api.departments() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    let subjects = match api.subjects() {
        Ok(v) => v,
        Err(e) => return api_err(req, e),
    };
    ok(
        &req.id,
        json!({ "streams": build_catalog(&streams, &departments, &subjects) }),
    )
}

fn build_catalog(
    streams: &[Stream],
    departments: &[Department],
    subjects: &[Subject],
) -> Vec<serde_json::Value> {
    streams
        .iter()
        .map(|stream| {
            let stream_departments: Vec<serde_json::Value> = departments
                .iter()
                .filter(|department| {
                    department.stream.as_ref().map(|s| s.id()) == Some(stream.id.as_str())
                })
                .map(|department| {
                    let department_subjects: Vec<&Subject> = subjects
                        .iter()
                        .filter(|subject| {
                            subject.department.as_ref().map(|d| d.id())
                                == Some(department.id.as_str())
                        })
                        .collect();
                    json!({
                        "_id": department.id,
                        "name": department.name,
                        "subjects": department_subjects,
                    })
                })
                .collect();
            json!({
                "_id": stream.id,
                "name": stream.name,
                "departments": stream_departments,
            })
        })
        .collect()
}
