//! tasktrack one-shot command implementations.

use serde::Serialize;

use crate::cli::CommandContext;
use crate::error::{Error, Result};
use crate::manager::{FieldChanges, SortKey, TaskFilter};
use crate::output::{emit_success, format_task_details, format_task_table, HumanOutput};
use crate::store::Record;
use crate::task::{
    validate_due_date, Priority, Status, Task, FIELD_DESCRIPTION, FIELD_DUE_DATE, FIELD_PRIORITY,
    FIELD_STATUS, FIELD_TITLE,
};

pub struct AddOptions {
    pub title: String,
    pub description: String,
    pub due: String,
    pub priority: String,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub sort: Option<String>,
}

pub struct ShowOptions {
    pub id: String,
}

pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

pub struct CompleteOptions {
    pub id: String,
}

pub struct DeleteOptions {
    pub id: String,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    sort: String,
    tasks: Vec<Record>,
}

#[derive(Serialize)]
struct TaskCompleteOutput {
    task: Record,
    already_completed: bool,
}

#[derive(Serialize)]
struct TaskDeleteOutput {
    task_id: String,
    deleted: bool,
}

#[derive(Serialize)]
struct TaskCountOutput {
    total: usize,
}

pub fn run_add(ctx: &CommandContext, options: AddOptions) -> Result<()> {
    let task = ctx.with_manager(|manager| {
        manager.add_task(
            &options.title,
            &options.description,
            &options.due,
            &options.priority,
        )
    })?;

    let mut human = HumanOutput::new("Task added");
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("tasktrack show {}", task.id()));

    emit_success(ctx.output, "add", &task.to_record(), Some(&human))
}

pub fn run_list(ctx: &CommandContext, options: ListOptions) -> Result<()> {
    let filter = TaskFilter {
        status: options
            .status
            .as_deref()
            .map(|raw| Status::parse(raw).map(|status| status.as_str().to_string()))
            .transpose()?,
        priority: options
            .priority
            .as_deref()
            .map(|raw| Priority::parse(raw).map(|priority| priority.as_str().to_string()))
            .transpose()?,
        due_date: options.due.as_deref().map(validate_due_date).transpose()?,
        ..TaskFilter::default()
    };
    let sort = options
        .sort
        .unwrap_or_else(|| ctx.config.display.default_sort.clone());

    let tasks: Vec<Task> = ctx.with_manager(|manager| {
        Ok(manager
            .get_tasks(&filter, &sort)
            .into_iter()
            .cloned()
            .collect())
    })?;

    let refs: Vec<&Task> = tasks.iter().collect();
    let mut human = if tasks.is_empty() {
        HumanOutput::new(if filter.is_empty() {
            "No tasks found. Add your first task!"
        } else {
            "No tasks match the specified filters."
        })
    } else {
        HumanOutput::new(format_task_table(&refs, &ctx.config.display))
    };
    human.push_summary("Total", tasks.len().to_string());
    if SortKey::parse(&sort).is_none() {
        human.push_warning(format!(
            "unknown sort key '{sort}', sorted by {} (expected {})",
            SortKey::DueDate.as_str(),
            SortKey::expected()
        ));
    }

    let output = TaskListOutput {
        total: tasks.len(),
        sort,
        tasks: tasks.iter().map(Task::to_record).collect(),
    };
    emit_success(ctx.output, "list", &output, Some(&human))
}

pub fn run_show(ctx: &CommandContext, options: ShowOptions) -> Result<()> {
    let task = ctx.with_manager(|manager| {
        manager
            .get_task_by_id(&options.id)
            .cloned()
            .ok_or_else(|| Error::NotFound(options.id.clone()))
    })?;

    let human = HumanOutput::new(format_task_details(&task, &ctx.config.display));
    emit_success(ctx.output, "show", &task.to_record(), Some(&human))
}

pub fn run_update(ctx: &CommandContext, options: UpdateOptions) -> Result<()> {
    let mut changes = FieldChanges::new();
    for (field, value) in [
        (FIELD_TITLE, options.title),
        (FIELD_DESCRIPTION, options.description),
        (FIELD_DUE_DATE, options.due),
        (FIELD_PRIORITY, options.priority),
        (FIELD_STATUS, options.status),
    ] {
        if let Some(value) = value {
            changes.insert(field.to_string(), value);
        }
    }
    if changes.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update; pass at least one of --title, --desc, --due, --priority, --status"
                .to_string(),
        ));
    }

    let task = ctx.with_manager(|manager| manager.update_task_details(&options.id, &changes))?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task);
    for field in changes.keys() {
        human.push_detail(format!("{field} changed"));
    }
    emit_success(ctx.output, "update", &task.to_record(), Some(&human))
}

pub fn run_complete(ctx: &CommandContext, options: CompleteOptions) -> Result<()> {
    let (task, already_completed) = ctx.with_manager(|manager| {
        let current = manager
            .get_task_by_id(&options.id)
            .cloned()
            .ok_or_else(|| Error::NotFound(options.id.clone()))?;
        if current.status() == Status::Completed {
            return Ok((current, true));
        }
        let updated = manager.mark_completed(current.id())?;
        Ok((updated, false))
    })?;

    let mut human = if already_completed {
        HumanOutput::new(format!("Task '{}' is already completed", task.title()))
    } else {
        HumanOutput::new("Task marked as completed")
    };
    human.push_summary("Task", task.title());
    human.push_summary("Status", task.status().as_str());

    let output = TaskCompleteOutput {
        task: task.to_record(),
        already_completed,
    };
    emit_success(ctx.output, "complete", &output, Some(&human))
}

pub fn run_delete(ctx: &CommandContext, options: DeleteOptions) -> Result<()> {
    let task_id = ctx.with_manager(|manager| {
        let task_id = manager
            .get_task_by_id(&options.id)
            .map(|task| task.id().to_string())
            .ok_or_else(|| Error::NotFound(options.id.clone()))?;
        manager.delete_task(&task_id)?;
        Ok(task_id)
    })?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", task_id.as_str());

    let output = TaskDeleteOutput {
        task_id,
        deleted: true,
    };
    emit_success(ctx.output, "delete", &output, Some(&human))
}

pub fn run_count(ctx: &CommandContext) -> Result<()> {
    let total = ctx.with_manager(|manager| Ok(manager.get_task_count()))?;

    let output = TaskCountOutput { total };
    let human = HumanOutput::new(total.to_string());
    emit_success(ctx.output, "count", &output, Some(&human))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id());
    human.push_summary("Title", task.title());
    human.push_summary("Priority", task.priority().as_str());
    human.push_summary("Status", task.status().as_str());
    human.push_summary("Due Date", task.due_date());
}
