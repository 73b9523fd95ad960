use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::model::{BacklogStatus, Caste, Department, Faculty, Semester, Stream, Student, Subject};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx answer. The message is the backend's `error` field when the
    /// body carries one, otherwise the raw body or a generic status line.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct PromoteOutcome {
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the student-administration REST backend. Holds the base URL,
/// the bearer token and one reused blocking HTTP client.
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("campusd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn read_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let resp = check_status(builder.send()?)?;
        let body = resp.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// For endpoints whose response body we pass through or ignore.
    fn read_value(&self, builder: RequestBuilder) -> Result<serde_json::Value, ApiError> {
        let resp = check_status(builder.send()?)?;
        let body = resp.text()?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    pub fn list_students(&self, admission_type: Option<&str>) -> Result<Vec<Student>, ApiError> {
        let mut builder = self.request(Method::GET, "/api/students");
        if let Some(admission_type) = admission_type {
            builder = builder.query(&[("admissionType", admission_type)]);
        }
        self.read_json(builder)
    }

    pub fn get_student(&self, student_id: &str) -> Result<Student, ApiError> {
        self.read_json(self.request(Method::GET, &format!("/api/students/{student_id}")))
    }

    pub fn create_student(&self, body: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        self.read_value(self.request(Method::POST, "/api/students").json(body))
    }

    pub fn update_student(
        &self,
        student_id: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.read_value(
            self.request(Method::PUT, &format!("/api/students/{student_id}"))
                .json(body),
        )
    }

    pub fn delete_student(&self, student_id: &str) -> Result<(), ApiError> {
        check_status(
            self.request(Method::DELETE, &format!("/api/students/{student_id}"))
                .send()?,
        )?;
        Ok(())
    }

    pub fn promote_student(&self, student_id: &str) -> Result<PromoteOutcome, ApiError> {
        self.read_json(
            self.request(Method::PUT, &format!("/api/students/promote/{student_id}"))
                .json(&json!({})),
        )
    }

    pub fn add_backlog(
        &self,
        student_id: &str,
        subject_ids: &[&str],
        semester_id: &str,
    ) -> Result<(), ApiError> {
        let body = json!({ "subjectIds": subject_ids, "semesterId": semester_id });
        self.read_value(
            self.request(Method::POST, &format!("/api/students/{student_id}/add-backlog"))
                .json(&body),
        )?;
        Ok(())
    }

    pub fn update_backlog(
        &self,
        student_id: &str,
        backlog_id: &str,
        status: BacklogStatus,
    ) -> Result<(), ApiError> {
        let body = json!({ "status": status });
        self.read_value(
            self.request(
                Method::PUT,
                &format!("/api/students/{student_id}/update-backlog/{backlog_id}"),
            )
            .json(&body),
        )?;
        Ok(())
    }

    /// Authoritative subject list for a (semester, department) pairing.
    pub fn semester_subjects(
        &self,
        semester_id: &str,
        department_id: &str,
    ) -> Result<Vec<Subject>, ApiError> {
        self.read_json(self.request(
            Method::GET,
            &format!("/api/students/subjects/{semester_id}/{department_id}"),
        ))
    }

    pub fn generate_certificate(
        &self,
        student_id: &str,
        body: &serde_json::Value,
    ) -> Result<Vec<u8>, ApiError> {
        let resp = self
            .request(
                Method::POST,
                &format!("/api/students/generate-certificate/{student_id}"),
            )
            .json(body)
            .send()?;
        let resp = check_status(resp)?;
        Ok(resp.bytes()?.to_vec())
    }

    pub fn streams(&self) -> Result<Vec<Stream>, ApiError> {
        self.read_json(self.request(Method::GET, "/api/streams"))
    }

    pub fn departments(&self) -> Result<Vec<Department>, ApiError> {
        self.read_json(self.request(Method::GET, "/api/superadmin/departments"))
    }

    pub fn semesters(&self) -> Result<Vec<Semester>, ApiError> {
        self.read_json(self.request(Method::GET, "/api/superadmin/semesters"))
    }

    pub fn subjects(&self) -> Result<Vec<Subject>, ApiError> {
        self.read_json(self.request(Method::GET, "/api/superadmin/subjects"))
    }

    pub fn castes(&self) -> Result<Vec<Caste>, ApiError> {
        self.read_json(self.request(Method::GET, "/api/superadmin/castes"))
    }

    /// Unscoped roster used by the overview dashboard.
    pub fn all_students(&self) -> Result<Vec<Student>, ApiError> {
        self.read_json(self.request(Method::GET, "/api/superadmin/students"))
    }

    pub fn faculties(&self, role: &str) -> Result<Vec<Faculty>, ApiError> {
        self.read_json(
            self.request(Method::GET, "/api/superadmin/faculties")
                .query(&[("role", role)]),
        )
    }
}

fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("backend returned {}", status)
            } else {
                body.trim().to_string()
            }
        });
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
