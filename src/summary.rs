use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::{Caste, Department, Faculty, Ref, Stream, Student};

/// Fixed admission-type buckets for the enrollment summary. Anything the
/// roster carries outside these values is folded into the default bucket.
pub const ADMISSION_TYPE_BUCKETS: [&str; 3] = ["Normal", "Direct Second Year", "Lateral Entry"];
const DEFAULT_ADMISSION_BUCKET: &str = "Normal";
const UNKNOWN_GROUP: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBreakdown {
    pub month: String,
    pub departments: Vec<GroupCount>,
    pub admission_types: Vec<GroupCount>,
    pub categories: Vec<GroupCount>,
    pub streams: Vec<GroupCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    pub total_students: u64,
    pub departments: Vec<GroupCount>,
    pub admission_types: Vec<GroupCount>,
    pub categories: Vec<GroupCount>,
    pub streams: Vec<GroupCount>,
    pub admissions_by_month: Vec<MonthlyBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewSummary {
    pub total_students: u64,
    pub total_faculties: u64,
    pub department_count: u64,
    pub stream_count: u64,
    pub students_by_department: Vec<GroupCount>,
    pub faculties_by_department: Vec<GroupCount>,
    pub departments_by_stream: Vec<GroupCount>,
    pub students_by_stream: Vec<GroupCount>,
}

pub fn admission_bucket(raw: Option<&str>) -> &'static str {
    match raw {
        Some(value) => ADMISSION_TYPE_BUCKETS
            .iter()
            .copied()
            .find(|bucket| *bucket == value)
            .unwrap_or(DEFAULT_ADMISSION_BUCKET),
        None => DEFAULT_ADMISSION_BUCKET,
    }
}

/// Zero-padded `YYYY-MM` bucket key; lexical order is chronological order.
/// Unparseable dates get no bucket, like missing ones.
pub fn admission_month(raw: &str) -> Option<String> {
    let date = raw
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())?;
    Some(format!("{:04}-{:02}", date.year(), date.month()))
}

/// Counters for one slice of the roster (overall, or one admission month).
/// Seeded from the reference lists so zero-count groups stay visible, and
/// only known reference keys are counted.
struct GroupTallies {
    departments: HashMap<String, u64>,
    admission_types: HashMap<String, u64>,
    categories: HashMap<String, u64>,
    streams: HashMap<String, u64>,
}

impl GroupTallies {
    fn seeded(departments: &[Department], castes: &[Caste], streams: &[Stream]) -> Self {
        GroupTallies {
            departments: departments.iter().map(|d| (d.id.clone(), 0)).collect(),
            admission_types: ADMISSION_TYPE_BUCKETS
                .iter()
                .map(|bucket| (bucket.to_string(), 0))
                .collect(),
            categories: castes.iter().map(|c| (c.name.clone(), 0)).collect(),
            streams: streams.iter().map(|s| (s.id.clone(), 0)).collect(),
        }
    }

    fn record(&mut self, student: &Student) {
        if let Some(department) = &student.department {
            bump_known(&mut self.departments, department.id());
        }
        let bucket = admission_bucket(student.admission_type.as_deref());
        if let Some(count) = self.admission_types.get_mut(bucket) {
            *count += 1;
        }
        if let Some(name) = student.caste_category.as_deref() {
            bump_known(&mut self.categories, name);
        }
        if let Some(stream) = &student.stream {
            bump_known(&mut self.streams, stream.id());
        }
    }
}

fn bump_known(counts: &mut HashMap<String, u64>, key: &str) {
    if let Some(count) = counts.get_mut(key) {
        *count += 1;
    }
}

/// Count-descending; equal counts keep reference order (the sort is stable).
fn ranked(mut entries: Vec<GroupCount>) -> Vec<GroupCount> {
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

fn format_tallies(
    tallies: &GroupTallies,
    departments: &[Department],
    castes: &[Caste],
    streams: &[Stream],
) -> (Vec<GroupCount>, Vec<GroupCount>, Vec<GroupCount>, Vec<GroupCount>) {
    let department_counts = ranked(
        departments
            .iter()
            .map(|d| GroupCount {
                name: d.name.clone(),
                count: tallies.departments.get(&d.id).copied().unwrap_or(0),
            })
            .collect(),
    );
    let admission_counts = ranked(
        ADMISSION_TYPE_BUCKETS
            .iter()
            .map(|bucket| GroupCount {
                name: bucket.to_string(),
                count: tallies.admission_types.get(*bucket).copied().unwrap_or(0),
            })
            .collect(),
    );
    let category_counts = ranked(
        castes
            .iter()
            .map(|c| GroupCount {
                name: c.name.clone(),
                count: tallies.categories.get(&c.name).copied().unwrap_or(0),
            })
            .collect(),
    );
    let stream_counts = ranked(
        streams
            .iter()
            .map(|s| GroupCount {
                name: s.name.clone(),
                count: tallies.streams.get(&s.id).copied().unwrap_or(0),
            })
            .collect(),
    );
    (department_counts, admission_counts, category_counts, stream_counts)
}

pub fn enrollment_summary(
    students: &[Student],
    castes: &[Caste],
    departments: &[Department],
    streams: &[Stream],
) -> EnrollmentSummary {
    let mut overall = GroupTallies::seeded(departments, castes, streams);
    let mut monthly: BTreeMap<String, GroupTallies> = BTreeMap::new();

    for student in students {
        overall.record(student);

        // Students without a usable admission date stay out of the monthly
        // view but still count everywhere else.
        let Some(month) = student.admission_date.as_deref().and_then(admission_month) else {
            continue;
        };
        monthly
            .entry(month)
            .or_insert_with(|| GroupTallies::seeded(departments, castes, streams))
            .record(student);
    }

    let (department_counts, admission_counts, category_counts, stream_counts) =
        format_tallies(&overall, departments, castes, streams);

    // BTreeMap iteration gives the months ascending by key.
    let admissions_by_month = monthly
        .into_iter()
        .map(|(month, tallies)| {
            let (d, a, c, s) = format_tallies(&tallies, departments, castes, streams);
            MonthlyBreakdown {
                month,
                departments: d,
                admission_types: a,
                categories: c,
                streams: s,
            }
        })
        .collect();

    EnrollmentSummary {
        total_students: students.len() as u64,
        departments: department_counts,
        admission_types: admission_counts,
        categories: category_counts,
        streams: stream_counts,
        admissions_by_month,
    }
}

fn department_label(reference: Option<&Ref<Department>>, departments: &[Department]) -> String {
    match reference {
        Some(Ref::Full(department)) => department.name.clone(),
        Some(Ref::Id(id)) => departments
            .iter()
            .find(|d| &d.id == id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| id.clone()),
        None => UNKNOWN_GROUP.to_string(),
    }
}

fn stream_label(reference: Option<&Ref<Stream>>, streams: &[Stream]) -> String {
    match reference {
        Some(Ref::Full(stream)) => stream.name.clone(),
        Some(Ref::Id(id)) => streams
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.clone()),
        None => UNKNOWN_GROUP.to_string(),
    }
}

/// Deterministic order for label-keyed maps: count descending, then name.
fn ranked_labels(counts: HashMap<String, u64>) -> Vec<GroupCount> {
    let mut entries: Vec<GroupCount> = counts
        .into_iter()
        .map(|(name, count)| GroupCount { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries
}

pub fn overview_summary(
    students: &[Student],
    faculties: &[Faculty],
    departments: &[Department],
    streams: &[Stream],
) -> OverviewSummary {
    let mut students_by_department: HashMap<String, u64> = HashMap::new();
    for student in students {
        *students_by_department
            .entry(department_label(student.department.as_ref(), departments))
            .or_insert(0) += 1;
    }

    let mut faculties_by_department: HashMap<String, u64> = HashMap::new();
    for faculty in faculties {
        *faculties_by_department
            .entry(department_label(faculty.department.as_ref(), departments))
            .or_insert(0) += 1;
    }

    let mut departments_by_stream: HashMap<String, u64> = HashMap::new();
    for department in departments {
        *departments_by_stream
            .entry(stream_label(department.stream.as_ref(), streams))
            .or_insert(0) += 1;
    }

    // Seed with every stream so empty streams still chart as zero.
    let mut students_by_stream: HashMap<String, u64> =
        streams.iter().map(|s| (s.name.clone(), 0)).collect();
    for student in students {
        *students_by_stream
            .entry(stream_label(student.stream.as_ref(), streams))
            .or_insert(0) += 1;
    }

    OverviewSummary {
        total_students: students.len() as u64,
        total_faculties: faculties.len() as u64,
        department_count: departments.len() as u64,
        stream_count: streams.len() as u64,
        students_by_department: ranked_labels(students_by_department),
        faculties_by_department: ranked_labels(faculties_by_department),
        departments_by_stream: ranked_labels(departments_by_stream),
        students_by_stream: ranked_labels(students_by_stream),
    }
}
