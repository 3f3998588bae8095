//! Storage layer for tasktrack
//!
//! Everything lives under one data directory:
//!
//! ```text
//! <data_dir>/
//!   tasktrack.toml               # Optional configuration
//!   <database>/                  # One directory per database
//!     <collection>.jsonl         # One JSON document per line
//!     <collection>.lock          # Held for the lifetime of a session
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock;

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "tasktrack.toml";

const COLLECTION_EXTENSION: &str = "jsonl";
const LOCK_EXTENSION: &str = "lock";

/// Path resolution and file I/O rooted at a data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn database_dir(&self, database: &str) -> PathBuf {
        self.data_dir.join(database)
    }

    pub fn collection_file(&self, database: &str, collection: &str) -> PathBuf {
        self.database_dir(database)
            .join(collection)
            .with_extension(COLLECTION_EXTENSION)
    }

    pub fn collection_lock_file(&self, database: &str, collection: &str) -> PathBuf {
        self.database_dir(database)
            .join(collection)
            .with_extension(LOCK_EXTENSION)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create the database directory and an empty collection file if missing
    pub fn init_collection(&self, database: &str, collection: &str) -> Result<()> {
        fs::create_dir_all(self.database_dir(database))?;

        let file = self.collection_file(database, collection);
        if !file.exists() {
            File::create(&file)?;
        }

        Ok(())
    }

    // =========================================================================
    // JSONL helpers
    // =========================================================================

    /// Append one record as a line
    ///
    /// Not atomic on its own; callers hold the collection lock.
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        writeln!(file, "{}", json)?;
        file.sync_all()?;

        Ok(())
    }

    /// Replace the whole file with `records`, one per line, atomically
    pub fn write_jsonl<T: Serialize>(&self, path: &Path, records: &[T]) -> Result<()> {
        let mut buffer = Vec::new();
        for record in records {
            let json = serde_json::to_string(record)?;
            buffer.extend_from_slice(json.as_bytes());
            buffer.push(b'\n');
        }
        lock::write_atomic(path, &buffer)
    }

    /// Read all records from a JSONL file; a missing file reads as empty
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Row {
        id: u32,
        title: String,
    }

    fn row(id: u32, title: &str) -> Row {
        Row {
            id,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_storage_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let storage = Storage::new(root.clone());

        assert_eq!(storage.data_dir(), root.as_path());
        assert_eq!(storage.config_file(), root.join("tasktrack.toml"));
        assert_eq!(storage.database_dir("task_manager_db"), root.join("task_manager_db"));
        assert_eq!(
            storage.collection_file("task_manager_db", "tasks"),
            root.join("task_manager_db/tasks.jsonl")
        );
        assert_eq!(
            storage.collection_lock_file("task_manager_db", "tasks"),
            root.join("task_manager_db/tasks.lock")
        );
    }

    #[test]
    fn test_init_collection() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());

        storage.init_collection("db", "tasks").unwrap();
        assert!(storage.database_dir("db").is_dir());
        assert!(storage.collection_file("db", "tasks").is_file());

        // Idempotent and keeps existing contents
        storage
            .append_jsonl(&storage.collection_file("db", "tasks"), &row(1, "keep"))
            .unwrap();
        storage.init_collection("db", "tasks").unwrap();
        let rows: Vec<Row> = storage
            .read_jsonl(&storage.collection_file("db", "tasks"))
            .unwrap();
        assert_eq!(rows, vec![row(1, "keep")]);
    }

    #[test]
    fn test_jsonl_operations() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        let file = storage.collection_file("db", "tasks");

        storage.append_jsonl(&file, &row(1, "first")).unwrap();
        storage.append_jsonl(&file, &row(2, "second")).unwrap();

        let rows: Vec<Row> = storage.read_jsonl(&file).unwrap();
        assert_eq!(rows, vec![row(1, "first"), row(2, "second")]);

        storage.write_jsonl(&file, &[row(3, "only")]).unwrap();
        let rows: Vec<Row> = storage.read_jsonl(&file).unwrap();
        assert_eq!(rows, vec![row(3, "only")]);
    }

    #[test]
    fn test_read_jsonl_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        let rows: Vec<Row> = storage
            .read_jsonl(&temp.path().join("absent.jsonl"))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_read_jsonl_rejects_corrupt_lines() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        let file = temp.path().join("bad.jsonl");
        fs::write(&file, "{\"id\":1,\"title\":\"ok\"}\nnot json\n").unwrap();

        let result: Result<Vec<Row>> = storage.read_jsonl(&file);
        assert!(matches!(result, Err(crate::error::Error::Json(_))));
    }
}
