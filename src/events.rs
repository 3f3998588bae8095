//! Domain events.
//!
//! The manager reports what it did through an injected [`EventSink`]. Events
//! are JSON lines when written out; tests record them in memory instead.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub const EVENT_SCHEMA_VERSION: &str = "tasktrack.event.v1";

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    /// `-` means stdout; anything else non-blank is a file path.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<JsonlSink> {
        match self {
            EventDestination::Stdout => Ok(JsonlSink::stdout()),
            EventDestination::File(path) => JsonlSink::file(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CacheLoaded,
    TaskSkipped,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    UnknownSortKey,
}

/// A structured event with optional payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event: EventKind) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Attach a serializable payload to the event.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }
}

pub trait EventSink {
    fn emit(&self, event: &Event) -> Result<()>;
}

/// Writes each event as one JSON line.
pub struct JsonlSink {
    writer: RefCell<Box<dyn Write>>,
}

impl JsonlSink {
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(std::io::stdout()))
    }

    /// Append to `path`, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn from_writer(writer: Box<dyn Write>) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }
}

impl EventSink for JsonlSink {
    fn emit(&self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        let mut writer = self.writer.borrow_mut();
        writer.write_all(&serialized)?;
        writer.write_all(b"\n")?;
        writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

/// Keeps emitted events in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(|event| event.event).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &Event) -> Result<()> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn destination_parse() {
        assert!(EventDestination::parse(None).is_none());
        assert!(EventDestination::parse(Some("  ")).is_none());
        assert!(matches!(
            EventDestination::parse(Some("-")),
            Some(EventDestination::Stdout)
        ));
        match EventDestination::parse(Some(" events.jsonl ")) {
            Some(EventDestination::File(path)) => assert_eq!(path, PathBuf::from("events.jsonl")),
            other => panic!("unexpected destination: {other:?}"),
        }
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        let sink = EventDestination::File(path.clone()).open().expect("open");

        sink.emit(&Event::new(EventKind::CacheLoaded).with_data(json!({"count": 2})).unwrap())
            .expect("emit");
        sink.emit(&Event::new(EventKind::TaskDeleted)).expect("emit");

        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["schema_version"], EVENT_SCHEMA_VERSION);
        assert_eq!(lines[0]["event"], "cache_loaded");
        assert_eq!(lines[0]["data"]["count"], 2);
        assert_eq!(lines[1]["event"], "task_deleted");
        assert!(lines[1].get("data").is_none());
    }

    #[test]
    fn recording_sink_shares_buffer_between_clones() {
        let sink = RecordingSink::new();
        let handle = sink.clone();
        sink.emit(&Event::new(EventKind::TaskCreated)).unwrap();
        sink.emit(&Event::new(EventKind::UnknownSortKey)).unwrap();

        assert_eq!(
            handle.kinds(),
            vec![EventKind::TaskCreated, EventKind::UnknownSortKey]
        );
        handle.clear();
        assert!(sink.events().is_empty());
    }
}
