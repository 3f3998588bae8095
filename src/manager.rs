//! Task manager: the in-memory cache over a [`TaskStore`].
//!
//! Every mutation is written through: the store is changed first and the
//! cache only after the store accepted the change. The cache is ordered by
//! id, so prefix lookups resolve to the lexicographically smallest match.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::events::{Event, EventKind, EventSink};
use crate::store::{strip_protected_fields, StoreError, TaskStore};
use crate::task::{Status, Task, TaskField, FIELD_STATUS, FIELD_TASK_ID};

/// Field name to raw value, as collected from a user.
pub type FieldChanges = BTreeMap<String, String>;

/// Secondary sort key; status always sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    DueDate,
    CreationTimestamp,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [
        SortKey::Priority,
        SortKey::DueDate,
        SortKey::CreationTimestamp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Priority => "priority",
            SortKey::DueDate => "due_date",
            SortKey::CreationTimestamp => "creation_timestamp",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }

    /// Comma-separated list of accepted keys, for messages.
    pub fn expected() -> String {
        Self::ALL
            .iter()
            .map(|key| key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Priority => a.priority().rank().cmp(&b.priority().rank()),
            SortKey::DueDate => a.due_date().cmp(b.due_date()),
            SortKey::CreationTimestamp => a.created_at().cmp(&b.created_at()),
        }
    }
}

/// Exact-match criteria, combined with AND. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub task_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        fn check(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |value| value == actual)
        }

        check(&self.task_id, task.id())
            && check(&self.title, task.title())
            && check(&self.description, task.description())
            && check(&self.due_date, task.due_date())
            && check(&self.priority, task.priority().as_str())
            && check(&self.status, task.status().as_str())
            && self.created_at.map_or(true, |at| at == task.created_at())
    }
}

pub struct TaskManager<S: TaskStore> {
    store: S,
    cache: BTreeMap<String, Task>,
    sink: Box<dyn EventSink>,
}

impl<S: TaskStore> TaskManager<S> {
    /// Build the cache from every record in the store.
    ///
    /// Records that do not form a valid task are skipped. Failing to read
    /// the store at all is fatal.
    pub fn load(store: S, sink: Box<dyn EventSink>) -> Result<Self> {
        let records = store
            .fetch_all()
            .map_err(|err| store_failure("fetch", "*", err))?;

        let mut manager = Self {
            store,
            cache: BTreeMap::new(),
            sink,
        };

        let mut skipped = 0usize;
        for record in records {
            match Task::from_record(&record) {
                Ok(task) => {
                    if manager.cache.contains_key(task.id()) {
                        warn!(task_id = task.id(), "duplicate task id in store, keeping last");
                    }
                    manager.cache.insert(task.id().to_string(), task);
                }
                Err(err) => {
                    skipped += 1;
                    let task_id = record
                        .get(FIELD_TASK_ID)
                        .cloned()
                        .unwrap_or(Value::Null);
                    warn!(task_id = %task_id, error = %err, "skipping invalid task record");
                    manager.emit(
                        EventKind::TaskSkipped,
                        json!({ "task_id": task_id, "reason": err.to_string() }),
                    );
                }
            }
        }

        info!(count = manager.cache.len(), skipped, "task cache loaded");
        manager.emit(
            EventKind::CacheLoaded,
            json!({ "count": manager.cache.len(), "skipped": skipped }),
        );
        Ok(manager)
    }

    pub fn add_task(
        &mut self,
        title: &str,
        description: &str,
        due_date: &str,
        priority: &str,
    ) -> Result<Task> {
        let task = Task::new(title, description, due_date, priority)?;

        self.store
            .insert(&task.to_record())
            .map_err(|err| store_failure("insert", task.id(), err))?;
        self.cache.insert(task.id().to_string(), task.clone());

        info!(task_id = task.id(), title = task.title(), "task created");
        self.emit(
            EventKind::TaskCreated,
            json!({ "task_id": task.id(), "title": task.title() }),
        );
        Ok(task)
    }

    /// Filtered, sorted view of the cache.
    ///
    /// Status rank always leads. An unknown `sort_by` falls back to due date.
    pub fn get_tasks(&self, filter: &TaskFilter, sort_by: &str) -> Vec<&Task> {
        let key = SortKey::parse(sort_by).unwrap_or_else(|| {
            warn!(
                sort_by,
                fallback = SortKey::DueDate.as_str(),
                "unknown sort key"
            );
            self.emit(
                EventKind::UnknownSortKey,
                json!({ "requested": sort_by, "fallback": SortKey::DueDate.as_str() }),
            );
            SortKey::DueDate
        });

        let mut tasks: Vec<&Task> = self
            .cache
            .values()
            .filter(|task| filter.matches(task))
            .collect();
        tasks.sort_by(|a, b| {
            a.status()
                .rank()
                .cmp(&b.status().rank())
                .then_with(|| key.compare(a, b))
        });
        tasks
    }

    /// Exact id first, then the smallest id that starts with `token`.
    pub fn get_task_by_id(&self, token: &str) -> Option<&Task> {
        if let Some(task) = self.cache.get(token) {
            debug!(task_id = token, "exact id match");
            return Some(task);
        }
        if token.is_empty() {
            return None;
        }

        let found = self
            .cache
            .range::<str, _>((Bound::Included(token), Bound::Unbounded))
            .next()
            .filter(|(id, _)| id.starts_with(token))
            .map(|(_, task)| task);
        match found {
            Some(task) => debug!(token, task_id = task.id(), "prefix id match"),
            None => debug!(token, "no task matches id"),
        }
        found
    }

    pub fn update_task_details(&mut self, token: &str, changes: &FieldChanges) -> Result<Task> {
        let mut updated = self
            .get_task_by_id(token)
            .cloned()
            .ok_or_else(|| Error::NotFound(token.to_string()))?;
        if changes.is_empty() {
            return Err(Error::Validation("no fields to update".to_string()));
        }

        let mut applied = Vec::new();
        for (name, value) in changes {
            match TaskField::from_name(name) {
                Some(field) => {
                    updated.set_field(field, value)?;
                    applied.push(field.as_str());
                }
                None => debug!(task_id = updated.id(), field = %name, "ignoring non-updatable field"),
            }
        }

        let id = updated.id().to_string();
        let mut partial = updated.to_record();
        strip_protected_fields(&mut partial);
        let matched = self
            .store
            .update(&id, partial)
            .map_err(|err| store_failure("update", &id, err))?;
        if !matched {
            error!(task_id = %id, "task in cache but missing from store");
            return Err(Error::Store(format!("task {id} not found in store")));
        }
        self.cache.insert(id.clone(), updated.clone());

        info!(task_id = %id, fields = ?applied, "task updated");
        self.emit(
            EventKind::TaskUpdated,
            json!({ "task_id": id, "fields": applied }),
        );
        Ok(updated)
    }

    pub fn mark_completed(&mut self, token: &str) -> Result<Task> {
        let changes = FieldChanges::from([(
            FIELD_STATUS.to_string(),
            Status::Completed.as_str().to_string(),
        )]);
        self.update_task_details(token, &changes)
    }

    pub fn delete_task(&mut self, token: &str) -> Result<bool> {
        let id = self
            .get_task_by_id(token)
            .map(|task| task.id().to_string())
            .ok_or_else(|| Error::NotFound(token.to_string()))?;

        let removed = self
            .store
            .delete(&id)
            .map_err(|err| store_failure("delete", &id, err))?;
        if !removed {
            error!(task_id = %id, "task in cache but missing from store");
            return Err(Error::Store(format!("task {id} not found in store")));
        }
        self.cache.remove(&id);

        info!(task_id = %id, "task deleted");
        self.emit(EventKind::TaskDeleted, json!({ "task_id": id }));
        Ok(true)
    }

    pub fn get_task_count(&self) -> usize {
        self.cache.len()
    }

    /// Give the store back, e.g. to close it.
    pub fn into_store(self) -> S {
        self.store
    }

    fn emit(&self, kind: EventKind, data: Value) {
        let result = Event::new(kind)
            .with_data(data)
            .and_then(|event| self.sink.emit(&event));
        if let Err(err) = result {
            warn!(event = ?kind, error = %err, "failed to emit event");
        }
    }
}

fn store_failure(operation: &str, task_id: &str, err: StoreError) -> Error {
    let err = Error::from(err);
    if err.kind() == "validation" {
        warn!(operation, task_id, error = %err, "store rejected request");
    } else {
        error!(operation, task_id, error = %err, "store operation failed");
    }
    err
}
