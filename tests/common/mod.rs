#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tiny_http::{Header, Method, Response, Server};

pub fn temp_dir(prefix: &str) -> std::path::PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

// ---------------------------------------------------------------------------
// Sidecar driver

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    seq: u64,
}

impl Sidecar {
    pub fn spawn() -> Sidecar {
        let exe = env!("CARGO_BIN_EXE_campusd");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn campusd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Sidecar {
            child,
            stdin,
            reader: BufReader::new(stdout),
            seq: 0,
        }
    }

    pub fn connect(&mut self, backend: &MockBackend) {
        let result = self.request_ok(
            "backend.connect",
            json!({ "baseUrl": backend.base_url, "token": "test-token" }),
        );
        assert_eq!(
            result.get("backendUrl").and_then(|v| v.as_str()),
            Some(backend.base_url.as_str())
        );
    }

    fn roundtrip(&mut self, method: &str, params: Value) -> Value {
        self.seq += 1;
        let id = format!("r{}", self.seq);
        let payload = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: Value) -> Value {
        let value = self.roundtrip(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value.get("error").cloned().unwrap_or_default()
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    pub fn request_err(&mut self, method: &str, params: Value) -> Value {
        let value = self.roundtrip(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value.get("error").cloned().unwrap_or_else(|| json!({}))
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ---------------------------------------------------------------------------
// Scripted REST backend

#[derive(Default)]
pub struct BackendState {
    pub students: Vec<Value>,
    pub semesters: Vec<Value>,
    pub castes: Vec<Value>,
    pub departments: Vec<Value>,
    pub streams: Vec<Value>,
    pub subjects: Vec<Value>,
    pub faculties: Vec<Value>,
    /// `"semesterId/departmentId"` -> subject documents.
    pub semester_subjects: HashMap<String, Vec<Value>>,
    pub fail_student_update: bool,
    pub fail_add_backlog: bool,
    pub fail_semester_subjects: bool,
    /// Force this status from the certificate endpoint instead of a PDF.
    pub certificate_status: Option<u16>,
    pub last_certificate_body: Option<Value>,
    pub last_authorization: Option<String>,
    /// `"VERB /path"` per request, query strings stripped.
    pub calls: Vec<String>,
    next_id: u64,
}

pub struct MockBackend {
    pub base_url: String,
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub fn start(state: BackendState) -> MockBackend {
        let server = Server::http("127.0.0.1:0").expect("bind mock backend");
        let port = server
            .server_addr()
            .to_ip()
            .expect("mock backend ip addr")
            .port();
        let shared = Arc::new(Mutex::new(state));
        let handler_state = Arc::clone(&shared);
        thread::spawn(move || {
            while let Ok(mut request) = server.recv() {
                let response = {
                    let mut st = handler_state.lock().expect("mock state");
                    route(&mut st, &mut request)
                };
                let _ = request.respond(response);
            }
        });
        MockBackend {
            base_url: format!("http://127.0.0.1:{}", port),
            state: shared,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().expect("mock state")
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn student(&self, id: &str) -> Value {
        self.state()
            .students
            .iter()
            .find(|s| s["_id"].as_str() == Some(id))
            .cloned()
            .unwrap_or_else(|| panic!("student {} not in mock backend", id))
    }
}

fn route(state: &mut BackendState, request: &mut tiny_http::Request) -> Response<io::Cursor<Vec<u8>>> {
    let verb = match request.method() {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        _ => "OTHER",
    };
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (url, String::new()),
    };
    state.calls.push(format!("{} {}", verb, path));
    state.last_authorization = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_string());

    let mut raw_body = String::new();
    let _ = request.as_reader().read_to_string(&mut raw_body);
    let body: Value = serde_json::from_str(&raw_body).unwrap_or(Value::Null);

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (verb, segments.as_slice()) {
        ("GET", ["api", "students"]) => {
            let filter = query_param(&query, "admissionType");
            let students: Vec<Value> = state
                .students
                .iter()
                .filter(|s| match &filter {
                    Some(t) => s["admissionType"].as_str() == Some(t.as_str()),
                    None => true,
                })
                .cloned()
                .collect();
            json_response(200, &Value::Array(students))
        }
        ("GET", ["api", "students", "subjects", semester_id, department_id]) => {
            if state.fail_semester_subjects {
                return json_response(500, &json!({ "error": "subject lookup unavailable" }));
            }
            let key = format!("{}/{}", semester_id, department_id);
            let subjects = state.semester_subjects.get(&key).cloned().unwrap_or_default();
            json_response(200, &Value::Array(subjects))
        }
        ("GET", ["api", "students", id]) => match find_student(state, id) {
            Some(student) => json_response(200, &student),
            None => json_response(404, &json!({ "error": "student not found" })),
        },
        ("POST", ["api", "students", "generate-certificate", _id]) => {
            match state.certificate_status {
                Some(400) => json_response(400, &json!({ "error": "student has pending dues" })),
                Some(code) => json_response(code, &json!({ "error": "forced" })),
                None => {
                    state.last_certificate_body = Some(body);
                    pdf_response(b"%PDF-1.4 campusd test certificate".to_vec())
                }
            }
        }
        ("POST", ["api", "students", id, "add-backlog"]) => handle_add_backlog(state, id, &body),
        ("POST", ["api", "students"]) => {
            state.next_id += 1;
            let mut doc = body;
            if doc.get("_id").is_none() {
                doc["_id"] = json!(format!("s{}", state.next_id));
            }
            state.students.push(doc.clone());
            json_response(201, &doc)
        }
        ("PUT", ["api", "students", "promote", id]) => {
            if find_student(state, id).is_none() {
                return json_response(404, &json!({ "error": "student not found" }));
            }
            json_response(200, &json!({ "message": "Student promoted successfully" }))
        }
        ("PUT", ["api", "students", id, "update-backlog", backlog_id]) => {
            handle_update_backlog(state, id, backlog_id, &body)
        }
        ("PUT", ["api", "students", id]) => {
            if state.fail_student_update {
                return json_response(500, &json!({ "error": "student update unavailable" }));
            }
            let Some(student) = state
                .students
                .iter_mut()
                .find(|s| s["_id"].as_str() == Some(*id))
            else {
                return json_response(404, &json!({ "error": "student not found" }));
            };
            if let (Some(doc), Some(patch)) = (student.as_object_mut(), body.as_object()) {
                for (key, value) in patch {
                    doc.insert(key.clone(), value.clone());
                }
            }
            let updated = student.clone();
            json_response(200, &updated)
        }
        ("DELETE", ["api", "students", id]) => {
            let before = state.students.len();
            state.students.retain(|s| s["_id"].as_str() != Some(*id));
            if state.students.len() == before {
                return json_response(404, &json!({ "error": "student not found" }));
            }
            json_response(200, &json!({}))
        }
        ("GET", ["api", "streams"]) => json_response(200, &Value::Array(state.streams.clone())),
        ("GET", ["api", "superadmin", "departments"]) => {
            json_response(200, &Value::Array(state.departments.clone()))
        }
        ("GET", ["api", "superadmin", "semesters"]) => {
            json_response(200, &Value::Array(state.semesters.clone()))
        }
        ("GET", ["api", "superadmin", "subjects"]) => {
            json_response(200, &Value::Array(state.subjects.clone()))
        }
        ("GET", ["api", "superadmin", "castes"]) => {
            json_response(200, &Value::Array(state.castes.clone()))
        }
        ("GET", ["api", "superadmin", "students"]) => {
            json_response(200, &Value::Array(state.students.clone()))
        }
        ("GET", ["api", "superadmin", "faculties"]) => {
            let role = query_param(&query, "role");
            let faculties: Vec<Value> = state
                .faculties
                .iter()
                .filter(|f| match role.as_deref() {
                    Some("All") | None => true,
                    Some(role) => f["role"].as_str() == Some(role),
                })
                .cloned()
                .collect();
            json_response(200, &Value::Array(faculties))
        }
        _ => json_response(404, &json!({ "error": format!("no route for {} {}", verb, path) })),
    }
}

fn find_student(state: &BackendState, id: &str) -> Option<Value> {
    state
        .students
        .iter()
        .find(|s| s["_id"].as_str() == Some(id))
        .cloned()
}

fn handle_add_backlog(
    state: &mut BackendState,
    student_id: &str,
    body: &Value,
) -> Response<io::Cursor<Vec<u8>>> {
    if state.fail_add_backlog {
        return json_response(500, &json!({ "error": "backlog write unavailable" }));
    }
    let semester_id = body["semesterId"].as_str().unwrap_or_default().to_string();
    let subject_ids: Vec<String> = body["subjectIds"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let semester_doc = state
        .semesters
        .iter()
        .find(|s| s["_id"].as_str() == Some(semester_id.as_str()))
        .cloned()
        .unwrap_or_else(|| json!({ "_id": semester_id, "number": 0 }));

    let mut new_backlogs = Vec::new();
    for subject_id in &subject_ids {
        let subject_doc = state
            .subjects
            .iter()
            .chain(state.semester_subjects.values().flatten())
            .find(|s| s["_id"].as_str() == Some(subject_id.as_str()))
            .cloned()
            .unwrap_or_else(|| json!({ "_id": subject_id, "name": format!("Subject {}", subject_id) }));
        state.next_id += 1;
        new_backlogs.push(json!({
            "_id": format!("bl{}", state.next_id),
            "subject": subject_doc,
            "semester": semester_doc.clone(),
            "status": "Open",
        }));
    }

    let Some(student) = state
        .students
        .iter_mut()
        .find(|s| s["_id"].as_str() == Some(student_id))
    else {
        return json_response(404, &json!({ "error": "student not found" }));
    };
    let doc = student.as_object_mut().expect("student document");
    let backlogs = doc.entry("backlogs").or_insert_with(|| json!([]));
    if let Some(arr) = backlogs.as_array_mut() {
        arr.extend(new_backlogs);
    }
    json_response(200, &json!({ "ok": true }))
}

fn handle_update_backlog(
    state: &mut BackendState,
    student_id: &str,
    backlog_id: &str,
    body: &Value,
) -> Response<io::Cursor<Vec<u8>>> {
    let Some(student) = state
        .students
        .iter_mut()
        .find(|s| s["_id"].as_str() == Some(student_id))
    else {
        return json_response(404, &json!({ "error": "student not found" }));
    };
    let found = student["backlogs"]
        .as_array_mut()
        .and_then(|arr| {
            arr.iter_mut()
                .find(|b| b["_id"].as_str() == Some(backlog_id))
        })
        .map(|backlog| backlog["status"] = body["status"].clone())
        .is_some();
    if !found {
        return json_response(404, &json!({ "error": "backlog not found" }));
    }
    json_response(200, &json!({ "ok": true }))
}

fn json_response(status: u16, body: &Value) -> Response<io::Cursor<Vec<u8>>> {
    let data = serde_json::to_vec(body).expect("serialize response");
    Response::from_data(data)
        .with_status_code(status)
        .with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("content type header"),
        )
}

fn pdf_response(bytes: Vec<u8>) -> Response<io::Cursor<Vec<u8>>> {
    Response::from_data(bytes).with_status_code(200).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"application/pdf"[..])
            .expect("content type header"),
    )
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| url_decode(v))
    })
}

fn url_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte as char);
                        i += 3;
                    }
                    None => {
                        out.push('%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other as char);
                i += 1;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Fixtures

pub fn stream_doc(id: &str, name: &str) -> Value {
    json!({ "_id": id, "name": name })
}

pub fn department_doc(id: &str, name: &str, stream_id: &str) -> Value {
    json!({ "_id": id, "name": name, "stream": stream_id })
}

pub fn semester_doc(id: &str, number: i64) -> Value {
    json!({ "_id": id, "number": number })
}

pub fn subject_doc(id: &str, name: &str, department_id: &str) -> Value {
    json!({ "_id": id, "name": name, "department": department_id })
}

pub fn caste_doc(id: &str, name: &str, subcastes: &[&str]) -> Value {
    json!({ "_id": id, "name": name, "subcastes": subcastes })
}

pub fn faculty_doc(id: &str, department_id: Option<&str>, role: &str) -> Value {
    match department_id {
        Some(dept) => json!({ "_id": id, "department": dept, "role": role }),
        None => json!({ "_id": id, "role": role }),
    }
}

pub fn student_doc(id: &str) -> Value {
    json!({
        "_id": id,
        "firstName": "Asha",
        "lastName": "Verma",
        "enrollmentNumber": format!("EN-{}", id),
        "mobileNumber": "9999999999",
        "gender": "Female",
        "casteCategory": "General",
        "admissionType": "Regular",
        "admissionThrough": "Entrance Exam",
        "stream": "st1",
        "department": "d1",
        "semester": "sem1",
        "semesterRecords": [],
        "backlogs": [],
    })
}

/// Reference data shared by most scenarios: one stream, two departments,
/// three semesters, a small subject catalog and per-semester subject lists.
pub fn seeded_state() -> BackendState {
    let mut state = BackendState::default();
    state.streams = vec![stream_doc("st1", "Engineering")];
    state.departments = vec![
        department_doc("d1", "Computer Science", "st1"),
        department_doc("d2", "Electrical", "st1"),
    ];
    state.semesters = vec![
        semester_doc("sem1", 1),
        semester_doc("sem2", 2),
        semester_doc("sem3", 3),
    ];
    state.castes = vec![
        caste_doc("c1", "General", &[]),
        caste_doc("c2", "OBC", &["Kunbi"]),
    ];
    state.subjects = vec![
        subject_doc("sub1", "Mathematics", "d1"),
        subject_doc("sub2", "Physics", "d1"),
        subject_doc("sub3", "Circuits", "d2"),
    ];
    state.semester_subjects.insert(
        "sem1/d1".to_string(),
        vec![
            subject_doc("sub1", "Mathematics", "d1"),
            subject_doc("sub2", "Physics", "d1"),
        ],
    );
    state.semester_subjects.insert(
        "sem2/d1".to_string(),
        vec![subject_doc("sub4", "Data Structures", "d1")],
    );
    state
}
