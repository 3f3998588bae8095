//! Persistence port.
//!
//! The manager talks to storage only through [`TaskStore`], exchanging flat
//! [`Record`] mappings keyed by the wire field names in [`crate::task`].

use crate::error::Error;
use crate::task::{
    FIELD_CREATION_TIMESTAMP, FIELD_DESCRIPTION, FIELD_DUE_DATE, FIELD_PRIORITY, FIELD_STATUS,
    FIELD_TASK_ID, FIELD_TITLE,
};

mod document;

pub use document::DocumentStore;

/// One stored task: field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Fields an insert must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    FIELD_TASK_ID,
    FIELD_TITLE,
    FIELD_DESCRIPTION,
    FIELD_DUE_DATE,
    FIELD_PRIORITY,
    FIELD_STATUS,
];

/// Fields an update may never change. They are stripped, not rejected.
pub const PROTECTED_FIELDS: [&str; 3] = [FIELD_TASK_ID, FIELD_CREATION_TIMESTAMP, "_id"];

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("task with ID {0} already exists")]
    DuplicateKey(String),

    #[error("missing required fields: {0}")]
    MissingFields(String),

    #[error("update data cannot be empty")]
    EmptyUpdate,

    #[error("write failed: {0}")]
    Write(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyUpdate | StoreError::MissingFields(_) => {
                Error::Validation(err.to_string())
            }
            StoreError::Connection(message) => Error::Connection(message),
            other => Error::Store(other.to_string()),
        }
    }
}

pub trait TaskStore {
    /// Insert a new record. `task_id` must not exist yet.
    fn insert(&mut self, record: &Record) -> StoreResult<()>;

    fn fetch_all(&self) -> StoreResult<Vec<Record>>;

    /// Merge `partial` into the record with `task_id == id`.
    ///
    /// Returns `Ok(false)` when nothing matched. A match with no effective
    /// change still returns `Ok(true)`.
    fn update(&mut self, id: &str, partial: Record) -> StoreResult<bool>;

    /// Returns whether a record was found and removed.
    fn delete(&mut self, id: &str) -> StoreResult<bool>;
}

/// Names of required fields absent from `record`, comma-joined.
pub fn missing_required_fields(record: &Record) -> Option<String> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !record.contains_key(*field))
        .collect();
    if missing.is_empty() {
        None
    } else {
        Some(missing.join(", "))
    }
}

/// Remove protected fields from an update payload, returning the names removed.
pub fn strip_protected_fields(partial: &mut Record) -> Vec<&'static str> {
    PROTECTED_FIELDS
        .iter()
        .copied()
        .filter(|field| partial.remove(*field).is_some())
        .collect()
}
