//! Local document store.
//!
//! A collection is a JSONL file of task records. The exclusive lock on the
//! collection's lock file is the "connection": it is taken once in
//! [`DocumentStore::connect`], with a bounded wait, and released exactly once
//! by [`DocumentStore::close`] or on drop.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    missing_required_fields, strip_protected_fields, Record, StoreError, StoreResult, TaskStore,
};
use crate::config::StoreConfig;
use crate::error::Error;
use crate::lock::FileLock;
use crate::storage::Storage;
use crate::task::FIELD_TASK_ID;

#[derive(Debug)]
pub struct DocumentStore {
    storage: Storage,
    path: PathBuf,
    session: Option<FileLock>,
}

impl DocumentStore {
    pub fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let storage = Storage::new(config.data_dir.clone());
        storage
            .init_collection(&config.database, &config.collection)
            .map_err(|err| {
                StoreError::Connection(format!(
                    "cannot prepare collection under {}: {err}",
                    config.data_dir.display()
                ))
            })?;

        let lock_path = storage.collection_lock_file(&config.database, &config.collection);
        let session = FileLock::acquire(&lock_path, config.connect_timeout_ms).map_err(|err| {
            match err {
                Error::LockFailed(path) => StoreError::Connection(format!(
                    "store is in use by another session ({} not released within {} ms)",
                    path.display(),
                    config.connect_timeout_ms
                )),
                other => StoreError::Connection(other.to_string()),
            }
        })?;

        let store = Self {
            path: storage.collection_file(&config.database, &config.collection),
            storage,
            session: Some(session),
        };

        // Read once so an unreadable collection fails here, not mid-session.
        let documents = store
            .load()
            .map_err(|err| StoreError::Connection(format!("collection unreadable: {err}")))?
            .len();
        info!(
            database = %config.database,
            collection = %config.collection,
            documents,
            "connected to document store"
        );

        Ok(store)
    }

    /// Path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session);
            info!(path = %self.path.display(), "document store connection closed");
        }
    }

    /// Every JSON object in the collection. Lines holding other JSON values
    /// are skipped and disappear at the next rewrite; unparsable lines fail.
    fn load(&self) -> StoreResult<Vec<Record>> {
        let documents: Vec<Value> = self
            .storage
            .read_jsonl(&self.path)
            .map_err(|err| StoreError::Query(err.to_string()))?;

        Ok(documents
            .into_iter()
            .enumerate()
            .filter_map(|(index, document)| match document {
                Value::Object(record) => Some(record),
                other => {
                    warn!(
                        document = index + 1,
                        value = %other,
                        "skipping non-object document in collection"
                    );
                    None
                }
            })
            .collect())
    }

    fn save(&self, records: &[Record]) -> StoreResult<()> {
        self.storage
            .write_jsonl(&self.path, records)
            .map_err(|err| StoreError::Write(err.to_string()))
    }
}

impl Drop for DocumentStore {
    fn drop(&mut self) {
        self.release();
    }
}

impl TaskStore for DocumentStore {
    fn insert(&mut self, record: &Record) -> StoreResult<()> {
        if let Some(missing) = missing_required_fields(record) {
            return Err(StoreError::MissingFields(missing));
        }
        let id = record_id(record)
            .ok_or_else(|| StoreError::Write(format!("{FIELD_TASK_ID} must be a string")))?;

        let existing = self.load()?;
        if existing.iter().any(|other| record_id(other) == Some(id)) {
            return Err(StoreError::DuplicateKey(id.to_string()));
        }

        self.storage
            .append_jsonl(&self.path, record)
            .map_err(|err| StoreError::Write(err.to_string()))?;
        info!(task_id = id, "task inserted");
        Ok(())
    }

    fn fetch_all(&self) -> StoreResult<Vec<Record>> {
        let records = self.load()?;
        debug!(count = records.len(), "fetched tasks");
        Ok(records)
    }

    fn update(&mut self, id: &str, mut partial: Record) -> StoreResult<bool> {
        if partial.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        for field in strip_protected_fields(&mut partial) {
            warn!(task_id = id, field, "removed protected field from update data");
        }
        if partial.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }

        let mut records = self.load()?;
        let Some(record) = records
            .iter_mut()
            .find(|record| record_id(record) == Some(id))
        else {
            warn!(task_id = id, "no task found to update");
            return Ok(false);
        };

        let mut changed = false;
        for (field, value) in partial {
            if record.get(&field) != Some(&value) {
                record.insert(field, value);
                changed = true;
            }
        }

        if changed {
            self.save(&records)?;
            info!(task_id = id, "task updated");
        } else {
            info!(task_id = id, "task matched but no changes made");
        }
        Ok(true)
    }

    fn delete(&mut self, id: &str) -> StoreResult<bool> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|record| record_id(record) != Some(id));
        if records.len() == before {
            warn!(task_id = id, "no task found to delete");
            return Ok(false);
        }

        self.save(&records)?;
        info!(task_id = id, "task deleted");
        Ok(true)
    }
}

fn record_id(record: &Record) -> Option<&str> {
    record.get(FIELD_TASK_ID).and_then(Value::as_str)
}
