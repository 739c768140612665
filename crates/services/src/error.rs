//! Shared error types for the services crate.

use thiserror::Error;

use study_core::model::{HistoryError, SessionError, StudentError, StudentId};

/// Errors emitted by `TipsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TipsError {
    #[error("teaching tips are not configured")]
    Disabled,
    #[error("teaching tips returned an empty response")]
    EmptyResponse,
    #[error("teaching tips request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `RosterService`.
///
/// Storage failures have no variant here; they are logged inside the
/// service and the in-memory roster stays authoritative.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RosterError {
    #[error("no student with id {0}")]
    StudentNotFound(StudentId),
    #[error(transparent)]
    Student(#[from] StudentError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    History(#[from] HistoryError),
}
