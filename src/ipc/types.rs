use serde::Deserialize;

use crate::api::ApiClient;
use crate::model::{Student, Subject};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The one open backlog-review session. Constructed by `backlogs.open`,
/// its student is replaced wholesale by the post-update refetch, and the
/// whole value is dropped on `backlogs.close`.
pub struct ReviewSession {
    pub student_id: String,
    pub student: Student,
    pub department_id: String,
    /// Empty until a semester is selected.
    pub semester_id: String,
    /// Validation set for status updates; cleared eagerly whenever the
    /// selected semester changes.
    pub semester_subjects: Vec<Subject>,
}

pub struct AppState {
    pub backend: Option<ApiClient>,
    pub review: Option<ReviewSession>,
}
