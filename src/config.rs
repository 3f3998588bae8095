//! Configuration loading and management
//!
//! Handles parsing of `tasktrack.toml` configuration files.

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::manager::SortKey;
use crate::storage::Storage;

const APPLICATION: &str = "tasktrack";
const MAX_CONNECT_TIMEOUT_MS: u64 = 600_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Where and how the document store is opened
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory for databases and the config file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// How long to wait for another session to release the store
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Platform data directory, e.g. `~/.local/share/tasktrack` on Linux.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APPLICATION)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(format!(".{APPLICATION}")))
}

fn default_database() -> String {
    "task_manager_db".to_string()
}

fn default_collection() -> String {
    "tasks".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: default_database(),
            collection: default_collection(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Human output settings
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// `chrono` format for due dates in tables
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// `chrono` format for creation timestamps in detail views
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,

    /// Sort key used by `list` when none is given
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_datetime_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_sort() -> String {
    SortKey::DueDate.as_str().to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            datetime_format: default_datetime_format(),
            default_sort: default_sort(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a `tasktrack.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<data_dir>/tasktrack.toml`, or return defaults rooted at `data_dir`
    pub fn load_from_data_dir(data_dir: &Path) -> Result<Self> {
        let config_path = Storage::new(data_dir.to_path_buf()).config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();
            config.store.data_dir = data_dir.to_path_buf();
            Ok(config)
        }
    }

    /// Resolve configuration for one run.
    ///
    /// An explicit file wins; otherwise the file in the data directory is
    /// used if present. `data_dir` overrides whatever the file says.
    pub fn resolve(config_file: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match (config_file, data_dir) {
            (Some(path), _) => Self::load(path)?,
            (None, Some(dir)) => Self::load_from_data_dir(dir)?,
            (None, None) => Self::load_from_data_dir(&default_data_dir())?,
        };
        if let Some(dir) = data_dir {
            config.store.data_dir = dir.to_path_buf();
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.display.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        validate_name(&self.database, "store.database")?;
        validate_name(&self.collection, "store.collection")?;

        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > MAX_CONNECT_TIMEOUT_MS {
            return Err(Error::InvalidConfig(format!(
                "store.connect_timeout_ms must be between 1 and {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

impl DisplayConfig {
    fn validate(&self) -> Result<()> {
        if SortKey::parse(&self.default_sort).is_none() {
            return Err(Error::InvalidConfig(format!(
                "display.default_sort: invalid key '{}' (expected {})",
                self.default_sort,
                SortKey::expected()
            )));
        }
        validate_format(&self.date_format, "display.date_format")?;
        validate_format(&self.datetime_format, "display.datetime_format")?;
        Ok(())
    }
}

impl LogConfig {
    fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level).map_err(|err| {
            Error::InvalidConfig(format!("log.level: invalid filter '{}': {err}", self.level))
        })?;
        Ok(())
    }
}

/// Reject formats `chrono` would fail on while rendering.
fn validate_format(format: &str, field: &str) -> Result<()> {
    if format.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidConfig(format!(
            "{field}: invalid format '{format}'"
        )));
    }
    Ok(())
}

fn validate_name(name: &str, field: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(Error::InvalidConfig(format!(
            "{field} must use only letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CONFIG_FILE;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.store.database, "task_manager_db");
        assert_eq!(cfg.store.collection, "tasks");
        assert_eq!(cfg.store.connect_timeout_ms, 5000);
        assert!(cfg.store.data_dir.ends_with("tasktrack") || cfg.store.data_dir.ends_with(".tasktrack"));
        assert_eq!(cfg.display.date_format, "%Y-%m-%d");
        assert_eq!(cfg.display.datetime_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(cfg.display.default_sort, "due_date");
        assert_eq!(cfg.log.level, "error");
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[store]
data_dir = "/srv/tasks"
database = "work"
collection = "todo-items"
connect_timeout_ms = 250

[display]
date_format = "%d/%m/%Y"
default_sort = "priority"

[log]
level = "tasktrack=debug"
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.store.data_dir, PathBuf::from("/srv/tasks"));
        assert_eq!(cfg.store.database, "work");
        assert_eq!(cfg.store.collection, "todo-items");
        assert_eq!(cfg.store.connect_timeout_ms, 250);
        assert_eq!(cfg.display.date_format, "%d/%m/%Y");
        assert_eq!(cfg.display.datetime_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(cfg.display.default_sort, "priority");
        assert_eq!(cfg.log.level, "tasktrack=debug");
    }

    #[test]
    fn invalid_store_names_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[store]\ncollection = \"../escape\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(message) => assert!(message.contains("store.collection")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);

        for content in [
            "[store]\nconnect_timeout_ms = 0",
            "[store]\ndatabase = \"\"",
            "[display]\ndefault_sort = \"title\"",
            "[display]\ndate_format = \"%Q\"",
            "[log]\nlevel = \"tasktrack=loud\"",
        ] {
            fs::write(&path, content).expect("write config");
            let err = Config::load(&path).expect_err(content);
            assert!(
                matches!(err, Error::InvalidConfig(_)),
                "{content}: unexpected error {err:?}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[store\n").expect("write config");

        let err = Config::load(&path).expect_err("malformed");
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn load_from_data_dir_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_data_dir(dir.path()).expect("defaults");
        assert_eq!(cfg.store.data_dir, dir.path());
        assert_eq!(cfg.store.database, "task_manager_db");
    }

    #[test]
    fn resolve_prefers_data_dir_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[store]\ndata_dir = \"/elsewhere\"\ndatabase = \"alt\"")
            .expect("write config");

        let cfg = Config::resolve(Some(&path), Some(dir.path())).expect("resolve");
        assert_eq!(cfg.store.data_dir, dir.path());
        assert_eq!(cfg.store.database, "alt");

        let cfg = Config::resolve(Some(&path), None).expect("resolve");
        assert_eq!(cfg.store.data_dir, PathBuf::from("/elsewhere"));
    }
}
