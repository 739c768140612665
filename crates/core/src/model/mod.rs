mod curriculum;
mod ids;
mod session;
mod student;

pub use ids::{ParseIdError, SessionId, StudentId};

pub use curriculum::Curriculum;
pub use session::{SessionDraft, SessionError, StudySession};
pub use student::{HistoryError, Student, StudentError};
