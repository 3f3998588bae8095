mod support;

use std::fs;

use serde_json::json;
use tasktrack::events::{EventKind, RecordingSink};
use tasktrack::manager::{FieldChanges, TaskFilter, TaskManager};
use tasktrack::task::{Priority, Status};
use tasktrack::Error;

use support::DataDir;

fn changes(pairs: &[(&str, &str)]) -> FieldChanges {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.to_string()))
        .collect()
}

#[test]
fn buy_milk_lifecycle_survives_reconnect() {
    let data = DataDir::new();

    let id = {
        let mut manager = data.manager();
        let task = manager
            .add_task("  Buy milk ", "two litres", "2025-1-5", "high")
            .expect("add");
        assert_eq!(task.title(), "Buy milk");
        assert_eq!(task.due_date(), "2025-01-05");
        assert_eq!(task.priority(), Priority::High);
        assert_eq!(task.status(), Status::Pending);
        manager.into_store().close();
        task.id().to_string()
    };

    let mut manager = data.manager();
    assert_eq!(manager.get_task_count(), 1);
    let prefix = &id[..id.len() - 2];
    assert_eq!(manager.get_task_by_id(prefix).map(|t| t.id()), Some(id.as_str()));

    let done = manager.mark_completed(prefix).expect("complete");
    assert_eq!(done.status(), Status::Completed);
    manager.into_store().close();

    let mut manager = data.manager();
    let task = manager.get_task_by_id(&id).expect("still there");
    assert_eq!(task.status(), Status::Completed);
    assert!(manager.delete_task(&id).expect("delete"));
    manager.into_store().close();

    assert_eq!(data.manager().get_task_count(), 0);
}

#[test]
fn list_puts_open_work_first_then_sorts_by_key() {
    let data = DataDir::new();
    let mut manager = data.manager();

    let finished = manager.add_task("Finished", "", "2025-01-01", "High").unwrap();
    manager.mark_completed(finished.id()).unwrap();
    let late = manager.add_task("Late", "", "2025-03-01", "Low").unwrap();
    let early = manager.add_task("Early", "", "2025-02-01", "Medium").unwrap();
    let busy = manager.add_task("Busy", "", "2025-04-01", "High").unwrap();
    manager
        .update_task_details(busy.id(), &changes(&[("status", "In Progress")]))
        .unwrap();

    let by_due: Vec<&str> = manager
        .get_tasks(&TaskFilter::default(), "due_date")
        .into_iter()
        .map(|task| task.title())
        .collect();
    assert_eq!(by_due, ["Early", "Late", "Busy", "Finished"]);

    let by_priority: Vec<&str> = manager
        .get_tasks(&TaskFilter::default(), "priority")
        .into_iter()
        .map(|task| task.title())
        .collect();
    assert_eq!(by_priority, ["Early", "Late", "Busy", "Finished"]);

    let filter = TaskFilter {
        priority: Some("Low".to_string()),
        ..TaskFilter::default()
    };
    let low: Vec<&str> = manager
        .get_tasks(&filter, "due_date")
        .into_iter()
        .map(|task| task.id())
        .collect();
    assert_eq!(low, [late.id()]);
    assert_ne!(early.id(), late.id());
}

#[test]
fn update_never_touches_protected_fields() {
    let data = DataDir::new();
    let mut manager = data.manager();
    let task = manager.add_task("Draft", "", "2025-01-01", "Low").unwrap();

    let updated = manager
        .update_task_details(
            task.id(),
            &changes(&[
                ("task_id", "TASK-000000-HACK"),
                ("creation_timestamp", "2000-01-01T00:00:00Z"),
                ("title", "Final"),
            ]),
        )
        .unwrap();
    assert_eq!(updated.id(), task.id());
    assert_eq!(updated.created_at(), task.created_at());
    assert_eq!(updated.title(), "Final");
    manager.into_store().close();

    let manager = data.manager();
    let stored = manager.get_task_by_id(task.id()).expect("stored");
    assert_eq!(stored.title(), "Final");
    assert_eq!(stored.created_at(), task.created_at());
}

#[test]
fn invalid_input_leaves_cache_and_store_unchanged() {
    let data = DataDir::new();
    let mut manager = data.manager();
    let task = manager.add_task("Keep", "", "2025-01-01", "Low").unwrap();

    let err = manager
        .update_task_details(task.id(), &changes(&[("due_date", "2025-13-01")]))
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = manager.add_task("   ", "", "2025-01-01", "Low").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = manager.mark_completed("TASK-NOPE").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    assert_eq!(manager.get_task_count(), 1);
    manager.into_store().close();

    let manager = data.manager();
    assert_eq!(manager.get_task_count(), 1);
    assert_eq!(
        manager.get_task_by_id(task.id()).unwrap().due_date(),
        "2025-01-01"
    );
}

#[test]
fn load_skips_records_that_fail_validation() {
    let data = DataDir::new();
    data.manager().into_store().close();

    let good = json!({
        "task_id": "TASK-250101-GOOD",
        "title": "Good",
        "description": "",
        "due_date": "2025-01-01",
        "priority": "Low",
        "status": "Pending",
        "creation_timestamp": "2025-01-01T08:00:00Z"
    });
    let bad = json!({
        "task_id": "TASK-250101-BAD0",
        "title": "Bad",
        "description": "",
        "due_date": "someday",
        "priority": "Low",
        "status": "Pending"
    });
    fs::write(data.collection_file(), format!("{good}\n{bad}\n")).unwrap();

    let sink = RecordingSink::new();
    let manager = TaskManager::load(data.connect(), Box::new(sink.clone())).expect("load");
    assert_eq!(manager.get_task_count(), 1);
    assert!(manager.get_task_by_id("TASK-250101-GOOD").is_some());
    assert_eq!(
        sink.kinds(),
        [EventKind::TaskSkipped, EventKind::CacheLoaded]
    );
}

#[test]
fn second_session_cannot_connect_while_first_is_open() {
    let data = DataDir::new();
    let manager = data.manager();

    let err = tasktrack::store::DocumentStore::connect(&data.store_config()).unwrap_err();
    assert!(matches!(Error::from(err), Error::Connection(_)));

    manager.into_store().close();
    data.manager().into_store().close();
}
