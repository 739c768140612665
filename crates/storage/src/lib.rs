#![forbid(unsafe_code)]

pub mod records;
pub mod repository;
pub mod sqlite;

pub use records::{SessionRecord, StudentRecord, decode_roster, encode_roster};
pub use repository::{InMemoryRepository, ROSTER_SLOT_KEY, RosterRepository, StorageError};
pub use sqlite::{SqliteInitError, SqliteRepository};
