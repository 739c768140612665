use std::sync::Arc;

use storage::repository::{InMemoryRepository, RosterRepository};
use storage::sqlite::{SqliteInitError, SqliteRepository};
use study_core::model::Curriculum;

use crate::Clock;
use crate::roster_service::RosterService;
use crate::tips_service::TipsService;

/// Assembles app-facing services over a storage backend.
pub struct AppServices {
    roster: Arc<RosterService>,
    tips: Arc<TipsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Failure to open or migrate the database is logged and the app keeps
    /// going on a throwaway in-memory roster instead of refusing to start.
    pub async fn open_sqlite(db_url: &str, clock: Clock) -> Self {
        match Self::try_sqlite(db_url, clock).await {
            Ok(services) => services,
            Err(err) => {
                log::error!("sqlite storage unavailable ({err}), continuing in memory");
                Self::in_memory(clock).await
            }
        }
    }

    /// Build services over an in-memory store that forgets everything on exit.
    pub async fn in_memory(clock: Clock) -> Self {
        Self::with_repository(clock, Arc::new(InMemoryRepository::new())).await
    }

    async fn try_sqlite(db_url: &str, clock: Clock) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(db_url).await?;
        repo.migrate().await?;
        Ok(Self::with_repository(clock, Arc::new(repo)).await)
    }

    async fn with_repository(clock: Clock, repository: Arc<dyn RosterRepository>) -> Self {
        let roster = Arc::new(
            RosterService::load(clock, Curriculum::default_book(), repository).await,
        );
        let tips = Arc::new(TipsService::from_env());
        Self { roster, tips }
    }

    #[must_use]
    pub fn roster(&self) -> Arc<RosterService> {
        Arc::clone(&self.roster)
    }

    #[must_use]
    pub fn tips(&self) -> Arc<TipsService> {
        Arc::clone(&self.tips)
    }

    /// Flush state before shutdown.
    pub async fn close(&self) {
        self.roster.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::time::fixed_clock;

    #[tokio::test]
    async fn bad_database_url_falls_back_to_memory() {
        let services =
            AppServices::open_sqlite("sqlite:///nonexistent/dir/db.sqlite3", fixed_clock()).await;

        let id = services
            .roster()
            .add_student("Maria".into(), String::new(), None)
            .await
            .unwrap();
        assert!(services.roster().student(id).is_some());
    }

    #[tokio::test]
    async fn in_memory_services_start_empty() {
        let services = AppServices::in_memory(fixed_clock()).await;
        assert!(services.roster().students().is_empty());
    }
}
