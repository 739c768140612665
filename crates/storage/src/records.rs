//! Persisted JSON shape for the student roster.
//!
//! The whole roster travels as one JSON document: an array of students in
//! camelCase with their history inlined. Documents written by early versions
//! may lack per-session ids and durations; decoding backfills those instead
//! of rejecting the document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use study_core::model::{SessionId, Student, StudentId, StudySession};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Persisted shape for one history entry.
///
/// `id`, `hours` and `minutes` were added after the first release, so they
/// are optional here and backfilled in [`SessionRecord::into_session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
    pub lesson: u32,
    pub paragraph: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub hours: Option<u32>,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_session(session: &StudySession) -> Self {
        Self {
            id: Some(session.id()),
            lesson: session.lesson(),
            paragraph: session.paragraph(),
            date: session.date(),
            hours: Some(session.hours()),
            minutes: Some(session.minutes()),
            notes: session.notes().map(str::to_owned),
        }
    }

    /// Convert the record back into a domain session.
    ///
    /// Entries written before sessions carried their own id get a fresh one;
    /// missing durations count as zero.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored fields fail domain
    /// validation.
    pub fn into_session(self) -> Result<StudySession, StorageError> {
        StudySession::from_persisted(
            self.id.unwrap_or_else(SessionId::new),
            self.lesson,
            self.paragraph,
            self.date,
            self.hours.unwrap_or(0),
            self.minutes.unwrap_or(0),
            self.notes,
        )
        .map_err(ser)
    }
}

/// Persisted shape for a student, mirroring the domain `Student`.
///
/// This keeps the storage document decoupled from the domain type so the
/// stored field names never drift when the domain changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: StudentId,
    pub name: String,
    pub contact: String,
    pub book_name: String,
    pub start_date: NaiveDate,
    pub current_lesson: u32,
    pub current_paragraph: u32,
    pub total_lessons: u32,
    #[serde(default)]
    pub history: Option<Vec<SessionRecord>>,
}

impl StudentRecord {
    #[must_use]
    pub fn from_student(student: &Student) -> Self {
        Self {
            id: student.id(),
            name: student.name().to_owned(),
            contact: student.contact().to_owned(),
            book_name: student.book_name().to_owned(),
            start_date: student.start_date(),
            current_lesson: student.current_lesson(),
            current_paragraph: student.current_paragraph(),
            total_lessons: student.total_lessons(),
            history: Some(
                student
                    .history()
                    .iter()
                    .map(SessionRecord::from_session)
                    .collect(),
            ),
        }
    }

    /// Convert the record back into a domain `Student`.
    ///
    /// A missing or null history counts as empty. The stored cursor is
    /// carried over untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if stored fields fail domain
    /// validation.
    pub fn into_student(self) -> Result<Student, StorageError> {
        let history = self
            .history
            .unwrap_or_default()
            .into_iter()
            .map(SessionRecord::into_session)
            .collect::<Result<Vec<_>, _>>()?;

        Student::from_persisted(
            self.id,
            self.name,
            self.contact,
            self.book_name,
            self.total_lessons,
            self.start_date,
            self.current_lesson,
            self.current_paragraph,
            history,
        )
        .map_err(ser)
    }
}

/// Encode the roster as the persisted JSON document.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the roster cannot be encoded.
pub fn encode_roster(students: &[Student]) -> Result<String, StorageError> {
    let records: Vec<StudentRecord> = students.iter().map(StudentRecord::from_student).collect();
    serde_json::to_string(&records).map_err(ser)
}

/// Decode a persisted JSON document back into domain students.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the document is not valid JSON
/// or any student in it fails domain validation.
pub fn decode_roster(json: &str) -> Result<Vec<Student>, StorageError> {
    let records: Vec<StudentRecord> = serde_json::from_str(json).map_err(ser)?;
    records.into_iter().map(StudentRecord::into_student).collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
