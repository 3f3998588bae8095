#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tasktrack::config::StoreConfig;
use tasktrack::events::NullSink;
use tasktrack::manager::TaskManager;
use tasktrack::store::DocumentStore;
use tempfile::TempDir;

/// A throwaway data directory holding the task databases.
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.path().to_path_buf(),
            connect_timeout_ms: 200,
            ..StoreConfig::default()
        }
    }

    pub fn collection_file(&self) -> PathBuf {
        self.path().join("task_manager_db").join("tasks.jsonl")
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.path().join("tasktrack.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    pub fn connect(&self) -> DocumentStore {
        DocumentStore::connect(&self.store_config()).expect("connect")
    }

    pub fn manager(&self) -> TaskManager<DocumentStore> {
        TaskManager::load(self.connect(), Box::new(NullSink)).expect("load manager")
    }
}

pub fn tasktrack_cmd(data: &DataDir) -> Command {
    let mut cmd = Command::cargo_bin("tasktrack").expect("binary");
    cmd.env_remove("RUST_LOG")
        .env_remove("TASKTRACK_DATA_DIR")
        .arg("--data-dir")
        .arg(data.path());
    cmd
}

/// Run with `--json` and parse the envelope printed on stdout.
pub fn json_output(data: &DataDir, args: &[&str]) -> Value {
    let output = tasktrack_cmd(data)
        .arg("--json")
        .args(args)
        .output()
        .expect("run tasktrack");
    serde_json::from_slice(&output.stdout).expect("json envelope")
}

/// Add a task through the CLI and return its id.
pub fn add_task(data: &DataDir, title: &str, due: &str, priority: &str) -> String {
    let envelope = json_output(data, &["add", title, "--due", due, "--priority", priority]);
    assert_eq!(envelope["status"], "success", "add failed: {envelope}");
    envelope["data"]["task_id"]
        .as_str()
        .expect("task_id")
        .to_string()
}
