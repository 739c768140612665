use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use study_core::model::Student;

use crate::records::{decode_roster, encode_roster};
use crate::repository::{ROSTER_SLOT_KEY, RosterRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl RosterRepository for SqliteRepository {
    async fn load(&self) -> Result<Option<Vec<Student>>, StorageError> {
        let row = sqlx::query("SELECT value FROM slots WHERE key = ?1")
            .bind(ROSTER_SLOT_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let json: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        decode_roster(&json).map(Some)
    }

    async fn save(&self, students: &[Student]) -> Result<(), StorageError> {
        let json = encode_roster(students)?;

        sqlx::query(
            r"
            INSERT INTO slots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(ROSTER_SLOT_KEY)
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
