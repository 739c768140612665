use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use storage::repository::RosterRepository;
use study_core::model::{Curriculum, SessionDraft, SessionId, Student, StudentId};

use crate::Clock;
use crate::error::RosterError;

/// Owns the live roster and keeps it in sync with storage.
///
/// The roster is loaded once when the service starts and written back after
/// every mutation. Storage trouble never takes the app down: a failed load
/// starts an empty roster and a failed save leaves the in-memory state as
/// the source of truth until the next write goes through.
pub struct RosterService {
    clock: Clock,
    curriculum: Curriculum,
    students: Mutex<Vec<Student>>,
    repository: Arc<dyn RosterRepository>,
}

impl RosterService {
    /// Load the stored roster and build the service around it.
    ///
    /// A missing document starts an empty roster; an unreadable one does the
    /// same and logs what went wrong.
    pub async fn load(
        clock: Clock,
        curriculum: Curriculum,
        repository: Arc<dyn RosterRepository>,
    ) -> Self {
        let students = match repository.load().await {
            Ok(Some(students)) => students,
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("failed to load stored roster, starting empty: {err}");
                Vec::new()
            }
        };

        Self {
            clock,
            curriculum,
            students: Mutex::new(students),
            repository,
        }
    }

    /// Snapshot of every student, in insertion order.
    #[must_use]
    pub fn students(&self) -> Vec<Student> {
        self.guard().clone()
    }

    /// Snapshot of a single student.
    #[must_use]
    pub fn student(&self, id: StudentId) -> Option<Student> {
        self.guard().iter().find(|s| s.id() == id).cloned()
    }

    /// Create a student and persist the roster.
    ///
    /// A missing start date defaults to today.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Student` for validation failures.
    pub async fn add_student(
        &self,
        name: String,
        contact: String,
        start_date: Option<NaiveDate>,
    ) -> Result<StudentId, RosterError> {
        let start = start_date.unwrap_or_else(|| self.clock.today());
        let student = Student::new(StudentId::new(), name, contact, start, &self.curriculum)?;
        let id = student.id();

        let snapshot = {
            let mut guard = self.guard();
            guard.push(student);
            guard.clone()
        };
        self.persist(&snapshot).await;
        Ok(id)
    }

    /// Update a student's name, contact and start date.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::StudentNotFound` if the id is unknown, or
    /// `RosterError::Student` for validation failures.
    pub async fn edit_student(
        &self,
        id: StudentId,
        name: String,
        contact: String,
        start_date: NaiveDate,
    ) -> Result<(), RosterError> {
        let snapshot = {
            let mut guard = self.guard();
            let student = guard
                .iter_mut()
                .find(|s| s.id() == id)
                .ok_or(RosterError::StudentNotFound(id))?;
            student.edit_identity(name, contact, start_date)?;
            guard.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Delete a student and persist the roster.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::StudentNotFound` if the id is unknown.
    pub async fn remove_student(&self, id: StudentId) -> Result<(), RosterError> {
        let snapshot = {
            let mut guard = self.guard();
            let index = guard
                .iter()
                .position(|s| s.id() == id)
                .ok_or(RosterError::StudentNotFound(id))?;
            guard.remove(index);
            guard.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Record a study session for a student and persist the roster.
    ///
    /// A missing date defaults to today.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::StudentNotFound` if the student id is unknown,
    /// or `RosterError::Session` for validation failures.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_session(
        &self,
        student_id: StudentId,
        lesson: u32,
        paragraph: u32,
        date: Option<NaiveDate>,
        hours: u32,
        minutes: u32,
        notes: Option<String>,
    ) -> Result<SessionId, RosterError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let mut draft = SessionDraft::new(lesson, paragraph, date).with_duration(hours, minutes);
        if let Some(notes) = notes {
            draft = draft.with_notes(notes);
        }

        let (session_id, snapshot) = {
            let mut guard = self.guard();
            let student = guard
                .iter_mut()
                .find(|s| s.id() == student_id)
                .ok_or(RosterError::StudentNotFound(student_id))?;
            let session_id = student.record_session(draft)?;
            (session_id, guard.clone())
        };
        self.persist(&snapshot).await;
        Ok(session_id)
    }

    /// Correct a history entry and persist the roster.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::StudentNotFound` if the student id is unknown,
    /// or `RosterError::History` if the session is missing or the draft is
    /// invalid.
    pub async fn amend_session(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        draft: SessionDraft,
    ) -> Result<(), RosterError> {
        let snapshot = {
            let mut guard = self.guard();
            let student = guard
                .iter_mut()
                .find(|s| s.id() == student_id)
                .ok_or(RosterError::StudentNotFound(student_id))?;
            student.amend_session(session_id, draft)?;
            guard.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Delete a history entry and persist the roster.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::StudentNotFound` if the student id is unknown,
    /// or `RosterError::History` if the session is missing.
    pub async fn remove_session(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<(), RosterError> {
        let snapshot = {
            let mut guard = self.guard();
            let student = guard
                .iter_mut()
                .find(|s| s.id() == student_id)
                .ok_or(RosterError::StudentNotFound(student_id))?;
            student.remove_session(session_id)?;
            guard.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Flush the roster to storage one last time.
    pub async fn close(&self) {
        let snapshot = self.guard().clone();
        self.persist(&snapshot).await;
    }

    // a poisoned lock still holds the roster; keep serving it
    fn guard(&self) -> MutexGuard<'_, Vec<Student>> {
        self.students.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a snapshot back to storage.
    ///
    /// Failures are logged and otherwise swallowed; the next successful save
    /// catches up.
    async fn persist(&self, students: &[Student]) {
        if let Err(err) = self.repository.save(students).await {
            log::error!("failed to persist roster: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use storage::repository::{InMemoryRepository, ROSTER_SLOT_KEY, RosterRepository, StorageError};
    use study_core::time::fixed_clock;

    async fn service_over(repo: InMemoryRepository) -> RosterService {
        RosterService::load(fixed_clock(), Curriculum::default_book(), Arc::new(repo)).await
    }

    fn a_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn add_student_persists_roster() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo.clone()).await;

        let id = service
            .add_student("Maria".into(), "555-1234".into(), Some(a_date()))
            .await
            .unwrap();

        assert_eq!(service.student(id).unwrap().name(), "Maria");
        let stored = repo.load().await.unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id(), id);
    }

    #[tokio::test]
    async fn add_student_defaults_start_date_to_today() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo).await;

        let id = service
            .add_student("Maria".into(), String::new(), None)
            .await
            .unwrap();

        // fixed test clock sits on 2023-11-14
        assert_eq!(
            service.student(id).unwrap().start_date(),
            NaiveDate::from_ymd_opt(2023, 11, 14).unwrap()
        );
    }

    #[tokio::test]
    async fn add_student_rejects_blank_name() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo.clone()).await;

        let err = service
            .add_student("   ".into(), String::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, RosterError::Student(_)));
        assert!(repo.raw_slot(ROSTER_SLOT_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn record_session_moves_cursor_and_persists() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo.clone()).await;
        let id = service
            .add_student("Maria".into(), String::new(), Some(a_date()))
            .await
            .unwrap();

        service
            .record_session(id, 3, 5, Some(a_date()), 1, 0, Some("first visit".into()))
            .await
            .unwrap();

        let student = service.student(id).unwrap();
        assert_eq!(student.current_lesson(), 3);
        assert_eq!(student.current_paragraph(), 5);

        let stored = repo.load().await.unwrap().unwrap();
        assert_eq!(stored[0].history().len(), 1);
    }

    #[tokio::test]
    async fn record_session_for_unknown_student_is_an_error() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo.clone()).await;

        let missing = StudentId::new();
        let err = service
            .record_session(missing, 1, 0, None, 0, 0, None)
            .await
            .unwrap_err();

        assert!(matches!(err, RosterError::StudentNotFound(id) if id == missing));
        assert!(repo.raw_slot(ROSTER_SLOT_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn amend_session_updates_history() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo).await;
        let id = service
            .add_student("Maria".into(), String::new(), Some(a_date()))
            .await
            .unwrap();
        let session_id = service
            .record_session(id, 3, 5, Some(a_date()), 0, 30, None)
            .await
            .unwrap();

        service
            .amend_session(id, session_id, SessionDraft::new(4, 2, a_date()))
            .await
            .unwrap();

        let student = service.student(id).unwrap();
        assert_eq!(student.current_lesson(), 4);
        assert_eq!(student.history()[0].paragraph(), 2);
    }

    #[tokio::test]
    async fn amend_unknown_session_is_an_error() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo).await;
        let id = service
            .add_student("Maria".into(), String::new(), Some(a_date()))
            .await
            .unwrap();

        let err = service
            .amend_session(id, SessionId::new(), SessionDraft::new(4, 2, a_date()))
            .await
            .unwrap_err();

        assert!(matches!(err, RosterError::History(_)));
    }

    #[tokio::test]
    async fn remove_student_shrinks_roster_and_persists() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo.clone()).await;
        let keep = service
            .add_student("Maria".into(), String::new(), Some(a_date()))
            .await
            .unwrap();
        let gone = service
            .add_student("Ana".into(), String::new(), Some(a_date()))
            .await
            .unwrap();

        service.remove_student(gone).await.unwrap();

        assert_eq!(service.students().len(), 1);
        assert!(service.student(keep).is_some());
        let stored = repo.load().await.unwrap().unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_student_is_an_error() {
        let repo = InMemoryRepository::new();
        let service = service_over(repo).await;

        let missing = StudentId::new();
        let err = service.remove_student(missing).await.unwrap_err();
        assert!(matches!(err, RosterError::StudentNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn load_starts_empty_when_document_is_corrupt() {
        let repo = InMemoryRepository::new();
        repo.set_raw_slot(ROSTER_SLOT_KEY, "{definitely not json").unwrap();

        let service = service_over(repo).await;
        assert!(service.students().is_empty());
    }

    #[tokio::test]
    async fn load_restores_previously_saved_roster() {
        let repo = InMemoryRepository::new();
        {
            let service = service_over(repo.clone()).await;
            let id = service
                .add_student("Maria".into(), "555".into(), Some(a_date()))
                .await
                .unwrap();
            service
                .record_session(id, 2, 1, Some(a_date()), 0, 45, None)
                .await
                .unwrap();
            service.close().await;
        }

        let reopened = service_over(repo).await;
        let students = reopened.students();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].current_lesson(), 2);
        assert_eq!(students[0].total_study_minutes(), 45);
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl RosterRepository for FailingStore {
        async fn load(&self) -> Result<Option<Vec<Student>>, StorageError> {
            Ok(None)
        }

        async fn save(&self, _students: &[Student]) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn save_failures_keep_the_in_memory_roster() {
        let service = RosterService::load(
            fixed_clock(),
            Curriculum::default_book(),
            Arc::new(FailingStore),
        )
        .await;

        let id = service
            .add_student("Maria".into(), String::new(), Some(a_date()))
            .await
            .unwrap();

        // the mutation sticks even though every save fails
        assert!(service.student(id).is_some());
        service
            .record_session(id, 2, 0, Some(a_date()), 0, 0, None)
            .await
            .unwrap();
        assert_eq!(service.student(id).unwrap().current_lesson(), 2);
    }
}
