//! Task entity.
//!
//! Fields are private. Every write goes through one `validate_*` function per
//! field, whether it happens at construction, through a setter, or while a
//! record is read back from the store.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Record;

pub const TASK_ID_PREFIX: &str = "TASK";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
const TASK_ID_DATE_FORMAT: &str = "%y%m%d";
const TASK_ID_SUFFIX_LEN: usize = 4;
const TASK_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub const FIELD_TASK_ID: &str = "task_id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_DUE_DATE: &str = "due_date";
pub const FIELD_PRIORITY: &str = "priority";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_CREATION_TIMESTAMP: &str = "creation_timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Accepts any casing (`low`, `LOW`, ` Low `).
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = capitalize(raw.trim());
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == normalized)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "priority must be one of: {} (got '{}')",
                    join_names(Self::ALL.iter().map(|p| p.as_str())),
                    raw.trim()
                ))
            })
    }

    /// Sort rank: High sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }

    /// Capitalizes every word and collapses inner whitespace, so
    /// `in   PROGRESS` parses as `In Progress`.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "status must be one of: {} (got '{}')",
                    join_names(Self::ALL.iter().map(|s| s.as_str())),
                    raw.trim()
                ))
            })
    }

    /// Sort rank: open work sorts before finished work.
    pub fn rank(self) -> u8 {
        match self {
            Status::Pending => 1,
            Status::InProgress => 2,
            Status::Completed => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields a caller may change after creation.
///
/// `task_id` and `creation_timestamp` have no variant and cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    Description,
    DueDate,
    Priority,
    Status,
}

impl TaskField {
    pub const ALL: [TaskField; 5] = [
        TaskField::Title,
        TaskField::Description,
        TaskField::DueDate,
        TaskField::Priority,
        TaskField::Status,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskField::Title => FIELD_TITLE,
            TaskField::Description => FIELD_DESCRIPTION,
            TaskField::DueDate => FIELD_DUE_DATE,
            TaskField::Priority => FIELD_PRIORITY,
            TaskField::Status => FIELD_STATUS,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

/// Inputs for [`Task::create`]. `id` and `created_at` are only supplied when
/// rebuilding a task that already exists.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: String,
    pub status: Option<String>,
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: String,
    title: String,
    description: String,
    due_date: String,
    priority: Priority,
    status: Status,
    created_at: DateTime<Utc>,
}

impl Task {
    /// A fresh Pending task with a generated id.
    pub fn new(title: &str, description: &str, due_date: &str, priority: &str) -> Result<Self> {
        Self::create(NewTask {
            title: title.to_string(),
            description: description.to_string(),
            due_date: due_date.to_string(),
            priority: priority.to_string(),
            ..NewTask::default()
        })
    }

    pub fn create(new: NewTask) -> Result<Self> {
        let id = match new.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => generate_task_id(),
        };
        let status = match new.status.as_deref() {
            Some(raw) => Status::parse(raw)?,
            None => Status::Pending,
        };

        Ok(Self {
            id,
            title: validate_title(&new.title)?,
            description: validate_description(&new.description),
            due_date: validate_due_date(&new.due_date)?,
            priority: Priority::parse(&new.priority)?,
            status,
            created_at: new.created_at.unwrap_or_else(Utc::now),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_title(&mut self, value: &str) -> Result<()> {
        self.title = validate_title(value)?;
        Ok(())
    }

    pub fn set_description(&mut self, value: &str) {
        self.description = validate_description(value);
    }

    pub fn set_due_date(&mut self, value: &str) -> Result<()> {
        self.due_date = validate_due_date(value)?;
        Ok(())
    }

    pub fn set_priority(&mut self, value: &str) -> Result<()> {
        self.priority = Priority::parse(value)?;
        Ok(())
    }

    pub fn set_status(&mut self, value: &str) -> Result<()> {
        self.status = Status::parse(value)?;
        Ok(())
    }

    /// Apply a raw value to an allow-listed field through its setter.
    pub fn set_field(&mut self, field: TaskField, value: &str) -> Result<()> {
        match field {
            TaskField::Title => self.set_title(value),
            TaskField::Description => {
                self.set_description(value);
                Ok(())
            }
            TaskField::DueDate => self.set_due_date(value),
            TaskField::Priority => self.set_priority(value),
            TaskField::Status => self.set_status(value),
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(FIELD_TASK_ID.to_string(), Value::String(self.id.clone()));
        record.insert(FIELD_TITLE.to_string(), Value::String(self.title.clone()));
        record.insert(
            FIELD_DESCRIPTION.to_string(),
            Value::String(self.description.clone()),
        );
        record.insert(FIELD_DUE_DATE.to_string(), Value::String(self.due_date.clone()));
        record.insert(
            FIELD_PRIORITY.to_string(),
            Value::String(self.priority.as_str().to_string()),
        );
        record.insert(
            FIELD_STATUS.to_string(),
            Value::String(self.status.as_str().to_string()),
        );
        record.insert(
            FIELD_CREATION_TIMESTAMP.to_string(),
            Value::String(format_timestamp(&self.created_at)),
        );
        record
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        let title = required_str(record, FIELD_TITLE)?;
        let description = required_str(record, FIELD_DESCRIPTION)?;
        let due_date = required_str(record, FIELD_DUE_DATE)?;
        let priority = required_str(record, FIELD_PRIORITY)?;
        let status = optional_str(record, FIELD_STATUS)?;
        let id = optional_str(record, FIELD_TASK_ID)?;

        let created_at = match record.get(FIELD_CREATION_TIMESTAMP).and_then(Value::as_str) {
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                warn!(
                    task_id = id.unwrap_or("<none>"),
                    value = raw,
                    "malformed creation timestamp, using current time"
                );
                Utc::now()
            }),
            None => Utc::now(),
        };

        Self::create(NewTask {
            title: title.to_string(),
            description: description.to_string(),
            due_date: due_date.to_string(),
            priority: priority.to_string(),
            status: status.map(str::to_string),
            id: id.map(str::to_string),
            created_at: Some(created_at),
        })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task({}): {} [{}] [{}] Due: {}",
            self.id, self.title, self.priority, self.status, self.due_date
        )
    }
}

/// `TASK-yymmdd-XXXX` with a suffix drawn from `[A-Z0-9]`.
pub fn generate_task_id() -> String {
    let date = Local::now().format(TASK_ID_DATE_FORMAT);
    let random = Uuid::new_v4();
    let suffix: String = random
        .as_bytes()
        .iter()
        .take(TASK_ID_SUFFIX_LEN)
        .map(|byte| TASK_ID_CHARSET[*byte as usize % TASK_ID_CHARSET.len()] as char)
        .collect();
    format!("{TASK_ID_PREFIX}-{date}-{suffix}")
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// RFC 3339 first, then the offset-less ISO form older stores wrote (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn validate_title(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("title cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_description(value: &str) -> String {
    value.trim().to_string()
}

/// Stored zero-padded so that text order is calendar order.
/// The year must be exactly four digits; chrono's `%Y` alone also takes
/// short and signed years.
pub fn validate_due_date(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let invalid = || {
        Error::Validation(format!(
            "due date must be a valid date in YYYY-MM-DD format (got '{trimmed}')"
        ))
    };

    let year = trimmed.split('-').next().unwrap_or_default();
    if year.len() != 4 || !year.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|_| invalid())
}

fn required_str<'a>(record: &'a Record, field: &str) -> Result<&'a str> {
    match record.get(field) {
        None => Err(Error::MissingField(field.to_string())),
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(Error::Validation(format!(
            "{field} must be a string (got {other})"
        ))),
    }
}

fn optional_str<'a>(record: &'a Record, field: &str) -> Result<Option<&'a str>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(Error::Validation(format!(
            "{field} must be a string (got {other})"
        ))),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
