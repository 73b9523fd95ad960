use serde_json::json;

use super::required_str;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, ReviewSession};
use crate::model::{BacklogStatus, SubjectStatus};
use crate::progression::{
    apply_subject_status, marks_for, reconcile_backlogs, subject_status, BacklogAction,
};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backlogs.open" => Some(handle_open(state, req)),
        "backlogs.close" => Some(handle_close(state, req)),
        "backlogs.selectSemester" => Some(handle_select_semester(state, req)),
        "backlogs.subjectStatus" => Some(handle_subject_status(state, req)),
        "backlogs.updateSubject" => Some(handle_update_subject(state, req)),
        _ => None,
    }
}

/// Fetch the student and resolve the subject list for their current
/// semester. Opening replaces any previously open review.
fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(api) = state.backend.as_ref() else {
        return err(&req.id, "no_backend", "connect to a backend first", None);
    };

    let student = match api.get_student(&student_id) {
        Ok(student) => student,
        Err(e) => {
            return err(
                &req.id,
                "api_request_failed",
                format!("failed to fetch student: {}", e),
                None,
            )
        }
    };

    let department_id = student
        .department
        .as_ref()
        .map(|d| d.id().to_string())
        .unwrap_or_default();
    let semester_id = student
        .semester
        .as_ref()
        .map(|s| s.id().to_string())
        .unwrap_or_default();

    let mut semester_subjects = Vec::new();
    let mut warning: Option<String> = None;
    if !semester_id.is_empty() && !department_id.is_empty() {
        match api.semester_subjects(&semester_id, &department_id) {
            Ok(subjects) => semester_subjects = subjects,
            Err(e) => {
                tracing::warn!(student = %student_id, "subject resolution failed on open: {}", e);
                warning = Some("failed to fetch subjects for the current semester".to_string());
            }
        }
    }
    if warning.is_none() && !semester_id.is_empty() && semester_subjects.is_empty() {
        warning = Some("no subjects available for this semester".to_string());
    }

    let result = json!({
        "student": &student,
        "semesterId": &semester_id,
        "departmentId": &department_id,
        "subjects": &semester_subjects,
        "warning": &warning,
    });

    state.review = Some(ReviewSession {
        student_id,
        student,
        department_id,
        semester_id,
        semester_subjects,
    });

    ok(&req.id, result)
}

fn handle_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_open = state.review.take().is_some();
    ok(&req.id, json!({ "closed": was_open }))
}

/// Switch the review to another semester. The stale subject list is dropped
/// before the new fetch so it can never validate an update against the
/// wrong semester.
fn handle_select_semester(state: &mut AppState, req: &Request) -> serde_json::Value {
    let semester_id = match required_str(req, "semesterId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let AppState { backend, review } = state;
    let Some(api) = backend.as_ref() else {
        return err(&req.id, "no_backend", "connect to a backend first", None);
    };
    let Some(session) = review.as_mut() else {
        return err(&req.id, "no_review", "open a student review first", None);
    };

    session.semester_id = semester_id.clone();
    session.semester_subjects.clear();

    if semester_id.is_empty() || session.department_id.is_empty() {
        return ok(&req.id, json!({ "subjects": [] }));
    }

    match api.semester_subjects(&semester_id, &session.department_id) {
        Ok(subjects) => {
            session.semester_subjects = subjects;
            if session.semester_subjects.is_empty() {
                return err(
                    &req.id,
                    "no_subjects",
                    "no subjects available for this semester and department",
                    None,
                );
            }
            ok(&req.id, json!({ "subjects": &session.semester_subjects }))
        }
        Err(e) => err(
            &req.id,
            "api_request_failed",
            format!("failed to fetch subjects: {}", e),
            None,
        ),
    }
}

fn handle_subject_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(session) = state.review.as_ref() else {
        return err(&req.id, "no_review", "open a student review first", None);
    };

    let status = if session.semester_id.is_empty() {
        SubjectStatus::Pending
    } else {
        subject_status(
            &session.student.semester_records,
            &session.semester_id,
            &subject_id,
        )
    };
    ok(&req.id, json!({ "subjectId": subject_id, "status": status }))
}

/// Assign Passed or Failed to one subject of the open review.
///
/// Runs as an ordered chain: validate locally, re-read the student,
/// reconcile the backlog collection, persist the full semester-record
/// array, refetch. The backlog step must land before persistence; if
/// persistence then fails the backend keeps the reconciled backlog while
/// the record stays stale, and the error reports which reconciliation ran
/// so the caller can see that window. The re-read at the top is what makes
/// retrying that failure safe: the existence check then sees the backlog
/// that already landed and plans no duplicate. The in-memory student is
/// only ever replaced by a fetched copy, never patched locally.
fn handle_update_subject(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match req.params.get("status").and_then(|v| v.as_str()) {
        Some("Passed") => SubjectStatus::Passed,
        Some("Failed") => SubjectStatus::Failed,
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                "status must be Passed or Failed",
                Some(json!({ "status": other })),
            )
        }
        None => return err(&req.id, "bad_params", "missing status", None),
    };

    let AppState { backend, review } = state;
    let Some(api) = backend.as_ref() else {
        return err(&req.id, "no_backend", "connect to a backend first", None);
    };
    let Some(session) = review.as_mut() else {
        return err(&req.id, "no_review", "open a student review first", None);
    };

    if session.semester_id.is_empty() {
        return err(&req.id, "validation_failed", "select a semester first", None);
    }
    if !session
        .semester_subjects
        .iter()
        .any(|subject| subject.id == subject_id)
    {
        return err(
            &req.id,
            "validation_failed",
            "subject is not part of the selected semester",
            Some(json!({ "subjectId": subject_id })),
        );
    }

    match api.get_student(&session.student_id) {
        Ok(fresh) => session.student = fresh,
        Err(e) => {
            return err(
                &req.id,
                "api_request_failed",
                format!("failed to fetch student: {}", e),
                None,
            )
        }
    }

    let candidate = apply_subject_status(
        &session.student.semester_records,
        &session.semester_id,
        &subject_id,
        status,
    );

    let action = reconcile_backlogs(
        &session.student.backlogs,
        &session.semester_id,
        &subject_id,
        status,
    );
    let reconciliation = match &action {
        Some(BacklogAction::Create) => {
            if let Err(e) = api.add_backlog(
                &session.student_id,
                &[subject_id.as_str()],
                &session.semester_id,
            ) {
                tracing::warn!(student = %session.student_id, "backlog create failed: {}", e);
                return err(
                    &req.id,
                    "api_request_failed",
                    format!("failed to record backlog: {}", e),
                    None,
                );
            }
            "created"
        }
        Some(BacklogAction::Clear { backlog_id }) => {
            if let Err(e) =
                api.update_backlog(&session.student_id, backlog_id, BacklogStatus::Cleared)
            {
                tracing::warn!(student = %session.student_id, "backlog clear failed: {}", e);
                return err(
                    &req.id,
                    "api_request_failed",
                    format!("failed to clear backlog: {}", e),
                    None,
                );
            }
            "cleared"
        }
        None => "none",
    };

    let payload = json!({ "semesterRecords": candidate });
    if let Err(e) = api.update_student(&session.student_id, &payload) {
        // The backlog may already be reconciled at this point; the candidate
        // is dropped and the session keeps its pre-update student.
        tracing::warn!(student = %session.student_id, "record persistence failed: {}", e);
        return err(
            &req.id,
            "api_request_failed",
            format!("failed to update subject status: {}", e),
            Some(json!({ "reconciliation": reconciliation })),
        );
    }

    let refreshed = match api.get_student(&session.student_id) {
        Ok(student) => student,
        Err(e) => {
            return err(
                &req.id,
                "api_request_failed",
                format!("failed to reload student: {}", e),
                Some(json!({ "reconciliation": reconciliation })),
            )
        }
    };
    session.student = refreshed;

    tracing::debug!(
        student = %session.student_id,
        subject = %subject_id,
        reconciliation,
        "subject status updated"
    );
    ok(
        &req.id,
        json!({
            "subjectId": subject_id,
            "status": status,
            "marks": marks_for(status),
            "reconciliation": reconciliation,
        }),
    )
}
