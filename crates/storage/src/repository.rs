use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use study_core::model::Student;

use crate::records::{decode_roster, encode_roster};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Fixed key the roster document is stored under.
pub const ROSTER_SLOT_KEY: &str = "bibleStudents";

/// Repository contract for the student roster.
///
/// The roster is persisted as a single document: `load` pulls the whole
/// thing once at startup, `save` rewrites it after every mutation.
#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// Fetch the stored roster, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or decoded.
    async fn load(&self) -> Result<Option<Vec<Student>>, StorageError>;

    /// Persist the whole roster, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be encoded or written.
    async fn save(&self, students: &[Student]) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Raw document stored under a key, if any.
    ///
    /// Lets tests inspect exactly what would hit disk.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn raw_slot(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    /// Overwrites the raw document stored under a key.
    ///
    /// Lets tests seed legacy or malformed payloads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn set_raw_slot(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.into());
        Ok(())
    }
}

#[async_trait]
impl RosterRepository for InMemoryRepository {
    async fn load(&self) -> Result<Option<Vec<Student>>, StorageError> {
        let raw = self.raw_slot(ROSTER_SLOT_KEY)?;
        raw.map(|json| decode_roster(&json)).transpose()
    }

    async fn save(&self, students: &[Student]) -> Result<(), StorageError> {
        let json = encode_roster(students)?;
        self.set_raw_slot(ROSTER_SLOT_KEY, json)
    }
}
