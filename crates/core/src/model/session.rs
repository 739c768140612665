use chrono::NaiveDate;
use thiserror::Error;

use crate::model::ids::SessionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson number must be at least 1")]
    LessonOutOfRange,

    #[error("minutes must be between 0 and 59, got {0}")]
    MinutesOutOfRange(u32),
}

//
// ─── SESSION DRAFT ─────────────────────────────────────────────────────────────
//

/// Unvalidated input for recording or correcting a study session.
///
/// Drafts come straight from user input; a [`StudySession`] is only built
/// from a draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub lesson: u32,
    pub paragraph: u32,
    pub date: NaiveDate,
    pub hours: u32,
    pub minutes: u32,
    pub notes: Option<String>,
}

impl SessionDraft {
    /// Creates a draft with zero duration and no notes.
    #[must_use]
    pub fn new(lesson: u32, paragraph: u32, date: NaiveDate) -> Self {
        Self {
            lesson,
            paragraph,
            date,
            hours: 0,
            minutes: 0,
            notes: None,
        }
    }

    /// Sets the time spent on the session.
    #[must_use]
    pub fn with_duration(mut self, hours: u32, minutes: u32) -> Self {
        self.hours = hours;
        self.minutes = minutes;
        self
    }

    /// Sets free-form notes for the session.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.lesson == 0 {
            return Err(SessionError::LessonOutOfRange);
        }
        if self.minutes > 59 {
            return Err(SessionError::MinutesOutOfRange(self.minutes));
        }
        Ok(())
    }

    fn normalized_notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
    }
}

//
// ─── STUDY SESSION ─────────────────────────────────────────────────────────────
//

/// A single entry in a student's study history.
///
/// Records where the study stopped (lesson and paragraph), when it happened
/// and how long it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    id: SessionId,
    lesson: u32,
    paragraph: u32,
    date: NaiveDate,
    hours: u32,
    minutes: u32,
    notes: Option<String>,
}

impl StudySession {
    /// Builds a session from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the draft fails validation.
    pub fn from_draft(id: SessionId, draft: SessionDraft) -> Result<Self, SessionError> {
        draft.validate()?;

        Ok(Self {
            id,
            lesson: draft.lesson,
            paragraph: draft.paragraph,
            date: draft.date,
            hours: draft.hours,
            minutes: draft.minutes,
            notes: draft.normalized_notes(),
        })
    }

    /// Rebuilds a session from stored fields.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the stored fields fail validation.
    pub fn from_persisted(
        id: SessionId,
        lesson: u32,
        paragraph: u32,
        date: NaiveDate,
        hours: u32,
        minutes: u32,
        notes: Option<String>,
    ) -> Result<Self, SessionError> {
        let draft = SessionDraft {
            lesson,
            paragraph,
            date,
            hours,
            minutes,
            notes,
        };
        Self::from_draft(id, draft)
    }

    /// Replaces every field except the id with values from a draft.
    ///
    /// The draft is validated before anything is written, so a failed
    /// correction leaves the session untouched.
    pub(crate) fn apply(&mut self, draft: SessionDraft) -> Result<(), SessionError> {
        draft.validate()?;

        self.notes = draft.normalized_notes();
        self.lesson = draft.lesson;
        self.paragraph = draft.paragraph;
        self.date = draft.date;
        self.hours = draft.hours;
        self.minutes = draft.minutes;
        Ok(())
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn lesson(&self) -> u32 {
        self.lesson
    }

    #[must_use]
    pub fn paragraph(&self) -> u32 {
        self.paragraph
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn hours(&self) -> u32 {
        self.hours
    }

    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Total time spent, in minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> u64 {
        u64::from(self.hours) * 60 + u64::from(self.minutes)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
