use chrono::NaiveDate;
use thiserror::Error;

use crate::model::curriculum::Curriculum;
use crate::model::ids::{SessionId, StudentId};
use crate::model::session::{SessionDraft, SessionError, StudySession};
use crate::progress;

/// Lesson the cursor points at before any session is recorded, and after
/// the last one is deleted.
const FIRST_LESSON: u32 = 1;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentError {
    #[error("student name cannot be empty")]
    EmptyName,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("no session with id {0}")]
    SessionNotFound(SessionId),

    #[error(transparent)]
    Session(#[from] SessionError),
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// A Bible student and their study progress.
///
/// The progress cursor (`current_lesson`, `current_paragraph`) always mirrors
/// the last entry of `history` in insertion order, or sits at the start of the
/// book when the history is empty. Every mutation below keeps that in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    id: StudentId,
    name: String,
    contact: String,
    book_name: String,
    total_lessons: u32,
    start_date: NaiveDate,
    current_lesson: u32,
    current_paragraph: u32,
    history: Vec<StudySession>,
}

impl Student {
    /// Creates a new Student at the start of the given curriculum.
    ///
    /// # Errors
    ///
    /// Returns `StudentError::EmptyName` if name is empty or whitespace-only.
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        contact: impl Into<String>,
        start_date: NaiveDate,
        curriculum: &Curriculum,
    ) -> Result<Self, StudentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StudentError::EmptyName);
        }

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            contact: contact.into().trim().to_owned(),
            book_name: curriculum.name().to_owned(),
            total_lessons: curriculum.total_lessons(),
            start_date,
            current_lesson: FIRST_LESSON,
            current_paragraph: 0,
            history: Vec::new(),
        })
    }

    /// Rebuilds a student from stored fields.
    ///
    /// The stored cursor is kept as-is rather than recomputed from the
    /// history, so whatever state was saved is what comes back.
    ///
    /// # Errors
    ///
    /// Returns `StudentError::EmptyName` if name is empty or whitespace-only.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: StudentId,
        name: impl Into<String>,
        contact: impl Into<String>,
        book_name: impl Into<String>,
        total_lessons: u32,
        start_date: NaiveDate,
        current_lesson: u32,
        current_paragraph: u32,
        history: Vec<StudySession>,
    ) -> Result<Self, StudentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StudentError::EmptyName);
        }

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            contact: contact.into().trim().to_owned(),
            book_name: book_name.into(),
            total_lessons,
            start_date,
            current_lesson,
            current_paragraph,
            history,
        })
    }

    /// Renames the student and updates their contact and start date.
    ///
    /// History and cursor are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StudentError::EmptyName` if name is empty or whitespace-only.
    pub fn edit_identity(
        &mut self,
        name: impl Into<String>,
        contact: impl Into<String>,
        start_date: NaiveDate,
    ) -> Result<(), StudentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StudentError::EmptyName);
        }

        self.name = name.trim().to_owned();
        self.contact = contact.into().trim().to_owned();
        self.start_date = start_date;
        Ok(())
    }

    /// Appends a session to the history and moves the cursor onto it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the draft fails validation; the student is
    /// left unchanged in that case.
    pub fn record_session(&mut self, draft: SessionDraft) -> Result<SessionId, SessionError> {
        let session = StudySession::from_draft(SessionId::new(), draft)?;
        let id = session.id();
        self.history.push(session);
        self.refresh_cursor();
        Ok(id)
    }

    /// Corrects an existing session in place.
    ///
    /// The cursor follows the correction only when the corrected entry is the
    /// newest one; corrections to older entries never move it.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::SessionNotFound` if no session has the given id,
    /// or the validation error if the draft is invalid.
    pub fn amend_session(&mut self, id: SessionId, draft: SessionDraft) -> Result<(), HistoryError> {
        let index = self
            .history
            .iter()
            .position(|s| s.id() == id)
            .ok_or(HistoryError::SessionNotFound(id))?;

        self.history[index].apply(draft)?;

        if index + 1 == self.history.len() {
            self.refresh_cursor();
        }
        Ok(())
    }

    /// Deletes a session and recomputes the cursor from the remaining history.
    ///
    /// When the last entry goes away the cursor falls back to the new newest
    /// entry, or to the start of the book if nothing is left.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::SessionNotFound` if no session has the given id.
    pub fn remove_session(&mut self, id: SessionId) -> Result<(), HistoryError> {
        let index = self
            .history
            .iter()
            .position(|s| s.id() == id)
            .ok_or(HistoryError::SessionNotFound(id))?;

        self.history.remove(index);
        self.refresh_cursor();
        Ok(())
    }

    fn refresh_cursor(&mut self) {
        if let Some(last) = self.history.last() {
            self.current_lesson = last.lesson();
            self.current_paragraph = last.paragraph();
        } else {
            self.current_lesson = FIRST_LESSON;
            self.current_paragraph = 0;
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn contact(&self) -> &str {
        &self.contact
    }

    #[must_use]
    pub fn book_name(&self) -> &str {
        &self.book_name
    }

    #[must_use]
    pub fn total_lessons(&self) -> u32 {
        self.total_lessons
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn current_lesson(&self) -> u32 {
        self.current_lesson
    }

    #[must_use]
    pub fn current_paragraph(&self) -> u32 {
        self.current_paragraph
    }

    /// Study history in insertion order, oldest first.
    #[must_use]
    pub fn history(&self) -> &[StudySession] {
        &self.history
    }

    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&StudySession> {
        self.history.iter().find(|s| s.id() == id)
    }

    /// The newest history entry, the one the cursor mirrors.
    #[must_use]
    pub fn last_session(&self) -> Option<&StudySession> {
        self.history.last()
    }

    /// Lesson and paragraph to prefill when recording the next session.
    #[must_use]
    pub fn suggested_next_lesson(&self) -> (u32, u32) {
        let lesson = self.current_lesson.saturating_add(1).min(self.total_lessons);
        (lesson, 0)
    }

    /// Total time recorded across the whole history, in minutes.
    #[must_use]
    pub fn total_study_minutes(&self) -> u64 {
        self.history.iter().map(StudySession::duration_minutes).sum()
    }

    /// How far through the book the cursor is, clamped to `[0, 100]`.
    #[must_use]
    pub fn completion_percent(&self) -> f64 {
        progress::completion_percent(self.current_lesson, self.total_lessons)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn a_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn maria() -> Student {
        Student::new(
            StudentId::new(),
            "Maria",
            "555-1234",
            a_date(),
            &Curriculum::default_book(),
        )
        .unwrap()
    }

    fn draft(lesson: u32, paragraph: u32) -> SessionDraft {
        SessionDraft::new(lesson, paragraph, a_date())
    }

    #[test]
    fn student_new_rejects_empty_name() {
        let err = Student::new(
            StudentId::new(),
            "   ",
            "555-1234",
            a_date(),
            &Curriculum::default_book(),
        )
        .unwrap_err();
        assert_eq!(err, StudentError::EmptyName);
    }

    #[test]
    fn student_new_starts_at_beginning_of_book() {
        let student = maria();
        assert_eq!(student.book_name(), "Seja Feliz Para Sempre!");
        assert_eq!(student.total_lessons(), 60);
        assert_eq!(student.current_lesson(), 1);
        assert_eq!(student.current_paragraph(), 0);
        assert!(student.history().is_empty());
    }

    #[test]
    fn student_trims_name_and_contact() {
        let student = Student::new(
            StudentId::new(),
            "  Maria  ",
            "  555-1234  ",
            a_date(),
            &Curriculum::default_book(),
        )
        .unwrap();
        assert_eq!(student.name(), "Maria");
        assert_eq!(student.contact(), "555-1234");
    }

    #[test]
    fn record_session_appends_and_moves_cursor() {
        let mut student = maria();

        let id = student.record_session(draft(3, 5)).unwrap();

        assert_eq!(student.history().len(), 1);
        assert_eq!(student.history()[0].id(), id);
        assert_eq!(student.current_lesson(), 3);
        assert_eq!(student.current_paragraph(), 5);
    }

    #[test]
    fn record_session_rejects_invalid_draft() {
        let mut student = maria();
        let before = student.clone();

        let err = student.record_session(draft(0, 0)).unwrap_err();

        assert_eq!(err, SessionError::LessonOutOfRange);
        assert_eq!(student, before);
    }

    #[test]
    fn cursor_can_move_backwards_with_the_history() {
        let mut student = maria();
        student.record_session(draft(10, 2)).unwrap();
        student.record_session(draft(4, 0)).unwrap();

        // newest entry wins even when it points earlier in the book
        assert_eq!(student.current_lesson(), 4);
        assert_eq!(student.current_paragraph(), 0);
    }

    #[test]
    fn amend_newest_session_moves_cursor() {
        let mut student = maria();
        let id = student.record_session(draft(3, 5)).unwrap();

        student.amend_session(id, draft(7, 1)).unwrap();

        assert_eq!(student.current_lesson(), 7);
        assert_eq!(student.current_paragraph(), 1);
    }

    #[test]
    fn amend_earlier_session_keeps_cursor() {
        let mut student = maria();
        let first = student.record_session(draft(2, 3)).unwrap();
        student.record_session(draft(5, 1)).unwrap();

        student.amend_session(first, draft(9, 9)).unwrap();

        assert_eq!(student.history()[0].lesson(), 9);
        assert_eq!(student.current_lesson(), 5);
        assert_eq!(student.current_paragraph(), 1);
    }

    #[test]
    fn amend_unknown_session_is_an_error() {
        let mut student = maria();
        student.record_session(draft(2, 0)).unwrap();

        let missing = SessionId::new();
        let err = student.amend_session(missing, draft(3, 0)).unwrap_err();

        assert_eq!(err, HistoryError::SessionNotFound(missing));
    }

    #[test]
    fn amend_with_invalid_draft_leaves_student_unchanged() {
        let mut student = maria();
        let id = student.record_session(draft(2, 0)).unwrap();
        let before = student.clone();

        let bad = draft(2, 0).with_duration(0, 75);
        assert!(student.amend_session(id, bad).is_err());
        assert_eq!(student, before);
    }

    #[test]
    fn remove_only_session_resets_cursor() {
        let mut student = maria();
        let id = student.record_session(draft(3, 5)).unwrap();

        student.remove_session(id).unwrap();

        assert!(student.history().is_empty());
        assert_eq!(student.current_lesson(), 1);
        assert_eq!(student.current_paragraph(), 0);
    }

    #[test]
    fn remove_newest_session_rewinds_cursor() {
        let mut student = maria();
        let first = student.record_session(draft(2, 3)).unwrap();
        let second = student.record_session(draft(5, 1)).unwrap();

        student.remove_session(second).unwrap();

        assert_eq!(student.history().len(), 1);
        assert_eq!(student.history()[0].id(), first);
        assert_eq!(student.current_lesson(), 2);
        assert_eq!(student.current_paragraph(), 3);
    }

    #[test]
    fn remove_earlier_session_keeps_cursor() {
        let mut student = maria();
        let first = student.record_session(draft(2, 3)).unwrap();
        student.record_session(draft(5, 1)).unwrap();

        student.remove_session(first).unwrap();

        assert_eq!(student.history().len(), 1);
        assert_eq!(student.current_lesson(), 5);
        assert_eq!(student.current_paragraph(), 1);
    }

    #[test]
    fn remove_newest_session_adopts_earlier_amendments() {
        let mut student = maria();
        let first = student.record_session(draft(2, 3)).unwrap();
        let second = student.record_session(draft(5, 1)).unwrap();

        student.amend_session(first, draft(9, 9)).unwrap();
        student.remove_session(second).unwrap();

        assert_eq!(student.current_lesson(), 9);
        assert_eq!(student.current_paragraph(), 9);
    }

    #[test]
    fn remove_unknown_session_is_an_error() {
        let mut student = maria();
        let missing = SessionId::new();
        let err = student.remove_session(missing).unwrap_err();
        assert_eq!(err, HistoryError::SessionNotFound(missing));
    }

    #[test]
    fn record_amend_remove_ends_back_at_the_start() {
        let mut student = maria();
        let id = student.record_session(draft(3, 2)).unwrap();

        student.amend_session(id, draft(4, 0)).unwrap();
        assert_eq!(student.current_lesson(), 4);
        assert_eq!(student.current_paragraph(), 0);

        student.remove_session(id).unwrap();
        assert!(student.history().is_empty());
        assert_eq!(student.current_lesson(), 1);
        assert_eq!(student.current_paragraph(), 0);
    }

    #[test]
    fn delete_then_record_behaves_like_plain_append() {
        let mut student = maria();
        let id = student.record_session(draft(3, 5)).unwrap();
        student.remove_session(id).unwrap();

        let replacement = student.record_session(draft(4, 2)).unwrap();

        assert_ne!(replacement, id);
        assert_eq!(student.history().len(), 1);
        assert_eq!(student.current_lesson(), 4);
        assert_eq!(student.current_paragraph(), 2);
    }

    #[test]
    fn edit_identity_keeps_history_and_cursor() {
        let mut student = maria();
        student.record_session(draft(6, 4)).unwrap();

        let new_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        student
            .edit_identity("  Maria Silva ", "maria@example.com", new_start)
            .unwrap();

        assert_eq!(student.name(), "Maria Silva");
        assert_eq!(student.contact(), "maria@example.com");
        assert_eq!(student.start_date(), new_start);
        assert_eq!(student.history().len(), 1);
        assert_eq!(student.current_lesson(), 6);
        assert_eq!(student.current_paragraph(), 4);
    }

    #[test]
    fn edit_identity_rejects_empty_name() {
        let mut student = maria();
        let err = student.edit_identity("", "x", a_date()).unwrap_err();
        assert_eq!(err, StudentError::EmptyName);
        assert_eq!(student.name(), "Maria");
    }

    #[test]
    fn suggested_next_lesson_advances_by_one() {
        let mut student = maria();
        student.record_session(draft(3, 5)).unwrap();
        assert_eq!(student.suggested_next_lesson(), (4, 0));
    }

    #[test]
    fn suggested_next_lesson_caps_at_book_end() {
        let mut student = maria();
        student.record_session(draft(60, 9)).unwrap();
        assert_eq!(student.suggested_next_lesson(), (60, 0));
    }

    #[test]
    fn total_study_minutes_sums_history() {
        let mut student = maria();
        student
            .record_session(draft(1, 0).with_duration(1, 30))
            .unwrap();
        student
            .record_session(draft(2, 0).with_duration(0, 45))
            .unwrap();
        assert_eq!(student.total_study_minutes(), 135);
    }

    #[test]
    fn from_persisted_trusts_stored_cursor() {
        let session = StudySession::from_persisted(
            SessionId::new(),
            3,
            5,
            a_date(),
            0,
            30,
            None,
        )
        .unwrap();

        // stored cursor disagrees with the last entry; it is kept anyway
        let student = Student::from_persisted(
            StudentId::new(),
            "Ana",
            "",
            "Seja Feliz Para Sempre!",
            60,
            a_date(),
            8,
            2,
            vec![session],
        )
        .unwrap();

        assert_eq!(student.current_lesson(), 8);
        assert_eq!(student.current_paragraph(), 2);
    }

    #[test]
    fn completion_percent_follows_cursor() {
        let mut student = maria();
        student.record_session(draft(30, 0)).unwrap();
        assert!((student.completion_percent() - 50.0).abs() < f64::EPSILON);
    }
}
