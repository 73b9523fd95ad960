use crate::model::{Backlog, BacklogStatus, Ref, SemesterRecord, SubjectStatus, SubjectOutcome};

/// Fixed marks policy: a status transition always recomputes marks, so the
/// two fields can never drift apart.
pub const PASSED_MARKS: f64 = 50.0;
pub const FAILED_MARKS: f64 = 0.0;

pub fn marks_for(status: SubjectStatus) -> f64 {
    match status {
        SubjectStatus::Passed => PASSED_MARKS,
        SubjectStatus::Failed | SubjectStatus::Pending => FAILED_MARKS,
    }
}

/// Status of one subject in one semester. Absence at either level (no record
/// for the semester, or no outcome for the subject) is Pending, not an error.
pub fn subject_status(
    records: &[SemesterRecord],
    semester_id: &str,
    subject_id: &str,
) -> SubjectStatus {
    records
        .iter()
        .find(|record| record.semester.id() == semester_id)
        .and_then(|record| {
            record
                .subjects
                .iter()
                .find(|outcome| outcome.subject.id() == subject_id)
        })
        .map(|outcome| outcome.status)
        .unwrap_or(SubjectStatus::Pending)
}

/// Candidate semester records after assigning `status` to one subject.
///
/// The input is left untouched; callers commit the result only once the
/// backend has accepted it. The semester record is created on first use,
/// the outcome is overwritten or appended, and the record's backlog flag is
/// rederived from its outcomes.
pub fn apply_subject_status(
    records: &[SemesterRecord],
    semester_id: &str,
    subject_id: &str,
    status: SubjectStatus,
) -> Vec<SemesterRecord> {
    let mut out = records.to_vec();
    match out
        .iter_mut()
        .find(|record| record.semester.id() == semester_id)
    {
        Some(record) => {
            match record
                .subjects
                .iter_mut()
                .find(|outcome| outcome.subject.id() == subject_id)
            {
                Some(outcome) => {
                    outcome.status = status;
                    outcome.marks = marks_for(status);
                }
                None => record.subjects.push(SubjectOutcome {
                    subject: Ref::Id(subject_id.to_string()),
                    status,
                    marks: marks_for(status),
                }),
            }
            record.is_backlog = record
                .subjects
                .iter()
                .any(|outcome| outcome.status == SubjectStatus::Failed);
        }
        None => out.push(SemesterRecord {
            id: None,
            semester: Ref::Id(semester_id.to_string()),
            subjects: vec![SubjectOutcome {
                subject: Ref::Id(subject_id.to_string()),
                status,
                marks: marks_for(status),
            }],
            is_backlog: status == SubjectStatus::Failed,
        }),
    }
    out
}

pub fn open_backlog<'a>(
    backlogs: &'a [Backlog],
    semester_id: &str,
    subject_id: &str,
) -> Option<&'a Backlog> {
    backlogs.iter().find(|backlog| {
        backlog.status == BacklogStatus::Open
            && backlog.subject.id() == subject_id
            && backlog.semester.id() == semester_id
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacklogAction {
    Create,
    Clear { backlog_id: String },
}

/// Which backlog request, if any, must land before the student record may be
/// persisted. A repeat of the same status plans nothing, which is what makes
/// a retry after a half-committed update safe.
pub fn reconcile_backlogs(
    backlogs: &[Backlog],
    semester_id: &str,
    subject_id: &str,
    status: SubjectStatus,
) -> Option<BacklogAction> {
    match status {
        SubjectStatus::Failed => match open_backlog(backlogs, semester_id, subject_id) {
            Some(_) => None,
            None => Some(BacklogAction::Create),
        },
        SubjectStatus::Passed => open_backlog(backlogs, semester_id, subject_id).map(|backlog| {
            BacklogAction::Clear {
                backlog_id: backlog.id.clone(),
            }
        }),
        SubjectStatus::Pending => None,
    }
}
