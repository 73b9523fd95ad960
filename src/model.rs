use serde::{Deserialize, Serialize};

/// A backend document reference. Reads come back populated, writes may send
/// the bare id; both shapes round-trip through the same field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Full(T),
    Id(String),
}

pub trait Entity {
    fn id(&self) -> &str;
}

impl<T: Entity> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Full(entity) => entity.id(),
            Ref::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectStatus {
    Pending,
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacklogStatus {
    Open,
    Cleared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caste_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_caste: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_through: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<Ref<Stream>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Ref<Department>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<Ref<Semester>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Ref<Subject>>,
    #[serde(default)]
    pub semester_records: Vec<SemesterRecord>,
    #[serde(default)]
    pub backlogs: Vec<Backlog>,
}

/// Per-semester container of a student's subject outcomes. `is_backlog` is
/// derived: true iff any outcome in the record is Failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub semester: Ref<Semester>,
    #[serde(default)]
    pub subjects: Vec<SubjectOutcome>,
    #[serde(default)]
    pub is_backlog: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOutcome {
    pub subject: Ref<Subject>,
    pub status: SubjectStatus,
    #[serde(default)]
    pub marks: f64,
}

/// Unresolved failed-subject record. Cleared only by an explicit Passed
/// re-evaluation of the same (subject, semester) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backlog {
    #[serde(rename = "_id")]
    pub id: String,
    pub subject: Ref<Subject>,
    pub semester: Ref<Semester>,
    pub status: BacklogStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<Ref<Stream>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    #[serde(rename = "_id")]
    pub id: String,
    pub number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Ref<Department>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caste {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subcastes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Ref<Department>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Entity for Stream {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Department {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Semester {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Subject {
    fn id(&self) -> &str {
        &self.id
    }
}
