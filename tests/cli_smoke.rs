mod support;

use predicates::str::contains;

use support::{add_task, json_output, tasktrack_cmd, DataDir};

#[test]
fn help_works() {
    let data = DataDir::new();
    tasktrack_cmd(&data)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("task tracker"));

    for cmd in ["add", "list", "show", "update", "complete", "delete", "count", "shell"] {
        tasktrack_cmd(&data).arg(cmd).arg("--help").assert().success();
    }
}

#[test]
fn add_then_show_and_count() {
    let data = DataDir::new();

    tasktrack_cmd(&data)
        .args(["add", "Buy milk", "--due", "2025-1-5", "--priority", "high"])
        .assert()
        .success()
        .stdout(contains("Task added"))
        .stdout(contains("- Due Date: 2025-01-05"));

    let envelope = json_output(&data, &["list"]);
    assert_eq!(envelope["schema_version"], "tasktrack.v1");
    assert_eq!(envelope["command"], "list");
    assert_eq!(envelope["data"]["total"], 1);
    let id = envelope["data"]["tasks"][0]["task_id"]
        .as_str()
        .expect("task_id")
        .to_string();

    tasktrack_cmd(&data)
        .args(["show", &id[..id.len() - 1]])
        .assert()
        .success()
        .stdout(contains(format!("Task ID:     {id}")))
        .stdout(contains("Priority:    High"));

    tasktrack_cmd(&data)
        .arg("count")
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn list_filters_and_sorts() {
    let data = DataDir::new();
    add_task(&data, "Later", "2025-03-01", "Low");
    add_task(&data, "Sooner", "2025-02-01", "Low");
    add_task(&data, "Urgent", "2025-04-01", "High");

    let envelope = json_output(&data, &["list", "--priority", "low"]);
    let titles: Vec<&str> = envelope["data"]["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .map(|task| task["title"].as_str().expect("title"))
        .collect();
    assert_eq!(titles, ["Sooner", "Later"]);

    let envelope = json_output(&data, &["list", "--sort", "priority"]);
    assert_eq!(envelope["data"]["sort"], "priority");
    assert_eq!(envelope["data"]["tasks"][0]["title"], "Urgent");

    let envelope = json_output(&data, &["list", "--sort", "title"]);
    assert_eq!(envelope["status"], "success");
    assert_eq!(envelope["data"]["tasks"][0]["title"], "Sooner");
    assert!(envelope["warnings"][0]
        .as_str()
        .expect("warning")
        .contains("unknown sort key 'title'"));

    tasktrack_cmd(&data)
        .args(["list", "--status", "Completed"])
        .assert()
        .success()
        .stdout(contains("No tasks match the specified filters."));
}

#[test]
fn update_complete_delete() {
    let data = DataDir::new();
    let id = add_task(&data, "Draft", "2025-01-01", "Medium");

    let envelope = json_output(
        &data,
        &["update", &id, "--title", "Final", "--status", "in progress"],
    );
    assert_eq!(envelope["data"]["title"], "Final");
    assert_eq!(envelope["data"]["status"], "In Progress");
    assert_eq!(envelope["data"]["task_id"], id.as_str());

    let envelope = json_output(&data, &["complete", &id]);
    assert_eq!(envelope["data"]["already_completed"], false);
    assert_eq!(envelope["data"]["task"]["status"], "Completed");

    tasktrack_cmd(&data)
        .args(["complete", &id])
        .assert()
        .success()
        .stdout(contains("is already completed"));

    let envelope = json_output(&data, &["delete", &id]);
    assert_eq!(envelope["data"]["deleted"], true);

    tasktrack_cmd(&data)
        .arg("count")
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn user_errors_exit_with_code_two() {
    let data = DataDir::new();

    tasktrack_cmd(&data)
        .args(["add", "Bad", "--due", "2025-02-30", "--priority", "Low"])
        .assert()
        .code(2)
        .stderr(contains("error: Validation failed"));

    tasktrack_cmd(&data)
        .args(["show", "TASK-MISSING"])
        .assert()
        .code(2)
        .stderr(contains("Task not found: TASK-MISSING"))
        .stderr(contains("hint: tasktrack list"));

    let id = add_task(&data, "Keep", "2025-01-01", "Low");
    tasktrack_cmd(&data)
        .args(["update", &id])
        .assert()
        .code(2)
        .stderr(contains("nothing to update"));

    let envelope = json_output(&data, &["add", "X", "--due", "2025-01-01", "--priority", "urgent"]);
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["command"], "add");
    assert_eq!(envelope["error"]["code"], 2);
    assert_eq!(envelope["error"]["kind"], "validation");
}

#[test]
fn invalid_config_is_rejected() {
    let data = DataDir::new();
    data.write_config("[display]\ndefault_sort = \"title\"\n");

    tasktrack_cmd(&data)
        .arg("count")
        .assert()
        .code(2)
        .stderr(contains("Invalid configuration"));

    data.write_config("[store\n");
    tasktrack_cmd(&data)
        .arg("count")
        .assert()
        .code(2)
        .stderr(contains("Invalid configuration"))
        .stderr(contains("tasktrack.toml"));
}

#[test]
fn events_flag_writes_jsonl() {
    let data = DataDir::new();
    let events = data.path().join("events.jsonl");

    tasktrack_cmd(&data)
        .arg("--events")
        .arg(&events)
        .args(["add", "Logged", "--due", "2025-01-01", "--priority", "Low"])
        .assert()
        .success();

    let contents = std::fs::read_to_string(&events).expect("events file");
    let kinds: Vec<String> = contents
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("event json");
            assert_eq!(value["schema_version"], "tasktrack.event.v1");
            value["event"].as_str().expect("event").to_string()
        })
        .collect();
    assert_eq!(kinds, ["cache_loaded", "task_created"]);
}

#[test]
fn shell_runs_from_stdin() {
    let data = DataDir::new();

    tasktrack_cmd(&data)
        .write_stdin("1\nBuy milk\ntwo litres\n2025-01-05\nHigh\n2\n8\n")
        .assert()
        .success()
        .stdout(contains("Loaded 0 tasks"))
        .stdout(contains("Task added successfully!"))
        .stdout(contains("Total tasks: 1"))
        .stdout(contains("Goodbye!"));

    tasktrack_cmd(&data)
        .arg("count")
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn config_file_selects_collection() {
    let data = DataDir::new();
    let config = data.write_config("[store]\ndatabase = \"home\"\ncollection = \"chores\"\n");

    tasktrack_cmd(&data)
        .arg("--config")
        .arg(&config)
        .args(["add", "Vacuum", "--due", "2025-01-01", "--priority", "Low"])
        .assert()
        .success();

    assert!(data.path().join("home").join("chores.jsonl").exists());
    tasktrack_cmd(&data)
        .arg("count")
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn update_lists_changed_fields() {
    let data = DataDir::new();
    let id = add_task(&data, "Draft", "2025-01-01", "Low");

    tasktrack_cmd(&data)
        .args(["update", &id, "--priority", "high", "--desc", "more"])
        .assert()
        .success()
        .stdout(contains("- Priority: High"))
        .stdout(contains("Details:\n- description changed\n- priority changed"));
}
