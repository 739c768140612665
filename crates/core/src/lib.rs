#![forbid(unsafe_code)]

pub mod model;
pub mod progress;
pub mod time;

pub use time::Clock;

pub use model::{
    Curriculum, HistoryError, ParseIdError, SessionDraft, SessionError, SessionId, Student,
    StudentError, StudentId, StudySession,
};
pub use progress::{ProgressColor, completion_percent};
