//! Interactive menu over a [`TaskManager`].
//!
//! Input and output are generic so the whole loop can be driven from a
//! byte buffer. End of input behaves like choosing Exit.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::cli::CommandContext;
use crate::config::DisplayConfig;
use crate::error::Result;
use crate::manager::{FieldChanges, SortKey, TaskFilter, TaskManager};
use crate::output::{format_task_details, format_task_table};
use crate::store::TaskStore;
use crate::task::{
    validate_due_date, Priority, Status, Task, FIELD_DESCRIPTION, FIELD_DUE_DATE, FIELD_PRIORITY,
    FIELD_STATUS, FIELD_TITLE,
};

const MENU_RULE: &str = "============================================================";
const SECTION_RULE: &str = "------------------------------------------------------------";
const MSG_INVALID_CHOICE: &str = "Invalid choice. Please enter a number between 1 and 8.";
const MSG_EMPTY_INPUT: &str = "Input cannot be empty. Please try again.";
const MSG_INVALID_DATE: &str = "Invalid date format. Please use YYYY-MM-DD (e.g., 2025-12-31).";
const MSG_INVALID_PRIORITY: &str = "Invalid priority. Please enter Low, Medium, or High.";

/// Run the shell on stdin/stdout against the configured store.
pub fn run(ctx: &CommandContext) -> Result<()> {
    ctx.with_manager(|manager| {
        let stdin = io::stdin();
        let stdout = io::stdout();
        Shell::new(manager, &ctx.config.display, stdin.lock(), stdout.lock()).run()
    })
}

enum Step {
    Continue,
    Exit,
}

pub struct Shell<'a, S: TaskStore, R: BufRead, W: Write> {
    manager: &'a mut TaskManager<S>,
    display: &'a DisplayConfig,
    input: R,
    out: W,
}

impl<'a, S: TaskStore, R: BufRead, W: Write> Shell<'a, S, R, W> {
    pub fn new(
        manager: &'a mut TaskManager<S>,
        display: &'a DisplayConfig,
        input: R,
        out: W,
    ) -> Self {
        Self {
            manager,
            display,
            input,
            out,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        writeln!(self.out, "{MENU_RULE}")?;
        writeln!(self.out, "         TASK MANAGEMENT APPLICATION")?;
        writeln!(self.out, "{MENU_RULE}")?;
        writeln!(self.out, "Loaded {} tasks", self.manager.get_task_count())?;

        loop {
            self.print_menu()?;
            let Some(choice) = self.read_choice()? else {
                break;
            };
            let step = match choice {
                1 => self.add_task(),
                2 => self.list_all_tasks(),
                3 => self.list_filtered_tasks(),
                4 => self.update_task(),
                5 => self.mark_task_completed(),
                6 => self.delete_task(),
                7 => self.view_task_details(),
                _ => Ok(Step::Exit),
            };
            match step {
                Ok(Step::Continue) => {}
                Ok(Step::Exit) => break,
                Err(err) if err.is_recoverable() => {
                    debug!(error = %err, "shell operation failed");
                    writeln!(self.out, "\nError: {err}")?;
                }
                Err(err) => return Err(err),
            }
        }

        writeln!(self.out, "\nGoodbye!")?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out, "\n{MENU_RULE}")?;
        for line in [
            "1. Add a new task",
            "2. List all tasks",
            "3. List tasks with filters",
            "4. Update a task",
            "5. Mark task as completed",
            "6. Delete a task",
            "7. View task details",
            "8. Exit",
        ] {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out, "{MENU_RULE}")?;
        Ok(())
    }

    fn read_choice(&mut self) -> Result<Option<u8>> {
        loop {
            let Some(raw) = self.prompt("\nEnter your choice (1-8): ")? else {
                return Ok(None);
            };
            match raw.parse::<u8>() {
                Ok(choice @ 1..=8) => return Ok(Some(choice)),
                _ => writeln!(self.out, "{MSG_INVALID_CHOICE}")?,
            }
        }
    }

    fn section(&mut self, title: &str) -> Result<()> {
        writeln!(self.out, "\n{SECTION_RULE}")?;
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "{SECTION_RULE}")?;
        Ok(())
    }

    fn add_task(&mut self) -> Result<Step> {
        self.section("ADD NEW TASK")?;

        let Some(title) = self.prompt_non_empty("Enter task title: ")? else {
            return Ok(Step::Exit);
        };
        let Some(description) = self.prompt("Enter task description: ")? else {
            return Ok(Step::Exit);
        };
        let Some(due_date) = self.prompt_valid_date("Enter due date (YYYY-MM-DD): ")? else {
            return Ok(Step::Exit);
        };
        let Some(priority) = self.prompt_valid_priority("Enter priority (Low/Medium/High): ")?
        else {
            return Ok(Step::Exit);
        };

        let task = self
            .manager
            .add_task(&title, &description, &due_date, &priority)?;
        self.section("Task added successfully!")?;
        writeln!(self.out, "  Task ID: {}", task.id())?;
        writeln!(self.out, "  Title: {}", task.title())?;
        writeln!(self.out, "  Priority: {}", task.priority())?;
        writeln!(self.out, "  Due Date: {}", task.due_date())?;
        writeln!(self.out, "{SECTION_RULE}")?;
        Ok(Step::Continue)
    }

    fn list_all_tasks(&mut self) -> Result<Step> {
        self.section("ALL TASKS")?;

        let tasks: Vec<Task> = self
            .manager
            .get_tasks(&TaskFilter::default(), &self.display.default_sort)
            .into_iter()
            .cloned()
            .collect();
        if tasks.is_empty() {
            writeln!(self.out, "\nNo tasks found. Add your first task!")?;
        } else {
            self.print_table(&tasks)?;
            writeln!(self.out, "\nTotal tasks: {}", tasks.len())?;
        }
        Ok(Step::Continue)
    }

    fn list_filtered_tasks(&mut self) -> Result<Step> {
        self.section("LIST TASKS WITH FILTERS")?;

        let Some(filter) = self.collect_filter()? else {
            return Ok(Step::Exit);
        };
        let Some(sort) = self.collect_sort()? else {
            return Ok(Step::Exit);
        };

        let tasks: Vec<Task> = self
            .manager
            .get_tasks(&filter, sort.as_str())
            .into_iter()
            .cloned()
            .collect();
        if tasks.is_empty() {
            writeln!(self.out, "\nNo tasks match the specified filters.")?;
        } else {
            writeln!(self.out, "\n{} task(s) found:", tasks.len())?;
            self.print_table(&tasks)?;
        }
        Ok(Step::Continue)
    }

    fn collect_filter(&mut self) -> Result<Option<TaskFilter>> {
        let mut filter = TaskFilter::default();
        writeln!(self.out, "\nAvailable filters (press Enter to skip):")?;

        let Some(status) = self.prompt("Filter by status (Pending/In Progress/Completed): ")?
        else {
            return Ok(None);
        };
        if !status.is_empty() {
            match Status::parse(&status) {
                Ok(status) => filter.status = Some(status.as_str().to_string()),
                Err(_) => writeln!(self.out, "Invalid status '{status}', skipping filter.")?,
            }
        }

        let Some(priority) = self.prompt("Filter by priority (Low/Medium/High): ")? else {
            return Ok(None);
        };
        if !priority.is_empty() {
            match Priority::parse(&priority) {
                Ok(priority) => filter.priority = Some(priority.as_str().to_string()),
                Err(_) => writeln!(self.out, "Invalid priority '{priority}', skipping filter.")?,
            }
        }

        let Some(due_date) = self.prompt("Filter by due date (YYYY-MM-DD): ")? else {
            return Ok(None);
        };
        if !due_date.is_empty() {
            match validate_due_date(&due_date) {
                Ok(canonical) => filter.due_date = Some(canonical),
                Err(_) => writeln!(self.out, "Invalid date format '{due_date}', skipping filter.")?,
            }
        }

        Ok(Some(filter))
    }

    fn collect_sort(&mut self) -> Result<Option<SortKey>> {
        writeln!(self.out, "\nSort options:")?;
        writeln!(self.out, "1. Due date (default)")?;
        writeln!(self.out, "2. Priority")?;
        writeln!(self.out, "3. Creation time")?;
        let Some(choice) = self.prompt("Choose sort option (1-3): ")? else {
            return Ok(None);
        };
        Ok(Some(match choice.as_str() {
            "2" => SortKey::Priority,
            "3" => SortKey::CreationTimestamp,
            _ => SortKey::DueDate,
        }))
    }

    fn update_task(&mut self) -> Result<Step> {
        self.section("UPDATE TASK")?;

        let Some(token) = self.prompt_non_empty("Enter task ID to update: ")? else {
            return Ok(Step::Exit);
        };
        let Some(task) = self.lookup(&token)? else {
            return Ok(Step::Continue);
        };
        writeln!(self.out, "\nCurrent task details:")?;
        self.print_details(&task)?;

        let Some(changes) = self.collect_changes(&task)? else {
            return Ok(Step::Exit);
        };
        if changes.is_empty() {
            writeln!(self.out, "\nNo changes made.")?;
            return Ok(Step::Continue);
        }

        let updated = self.manager.update_task_details(task.id(), &changes)?;
        writeln!(self.out, "\nTask updated successfully!")?;
        self.print_details(&updated)?;
        Ok(Step::Continue)
    }

    /// Blank answers keep the current value; invalid ones are dropped with a notice.
    fn collect_changes(&mut self, task: &Task) -> Result<Option<FieldChanges>> {
        let mut changes = FieldChanges::new();
        writeln!(
            self.out,
            "\nEnter new values (press Enter to keep current value):"
        )?;

        let Some(title) = self.prompt(&format!("Title [{}]: ", task.title()))? else {
            return Ok(None);
        };
        if !title.is_empty() {
            changes.insert(FIELD_TITLE.to_string(), title);
        }

        let Some(description) = self.prompt(&format!("Description [{}]: ", task.description()))?
        else {
            return Ok(None);
        };
        if !description.is_empty() {
            changes.insert(FIELD_DESCRIPTION.to_string(), description);
        }

        let Some(due_date) =
            self.prompt(&format!("Due date [{}] (YYYY-MM-DD): ", task.due_date()))?
        else {
            return Ok(None);
        };
        if !due_date.is_empty() {
            match validate_due_date(&due_date) {
                Ok(canonical) => {
                    changes.insert(FIELD_DUE_DATE.to_string(), canonical);
                }
                Err(_) => writeln!(self.out, "Invalid date format, keeping current due date.")?,
            }
        }

        let Some(priority) = self.prompt(&format!(
            "Priority [{}] (Low/Medium/High): ",
            task.priority()
        ))?
        else {
            return Ok(None);
        };
        if !priority.is_empty() {
            match Priority::parse(&priority) {
                Ok(priority) => {
                    changes.insert(FIELD_PRIORITY.to_string(), priority.as_str().to_string());
                }
                Err(_) => writeln!(self.out, "Invalid priority, keeping current priority.")?,
            }
        }

        let Some(status) = self.prompt(&format!(
            "Status [{}] (Pending/In Progress/Completed): ",
            task.status()
        ))?
        else {
            return Ok(None);
        };
        if !status.is_empty() {
            match Status::parse(&status) {
                Ok(status) => {
                    changes.insert(FIELD_STATUS.to_string(), status.as_str().to_string());
                }
                Err(_) => writeln!(self.out, "Invalid status, keeping current status.")?,
            }
        }

        Ok(Some(changes))
    }

    fn mark_task_completed(&mut self) -> Result<Step> {
        self.section("MARK TASK AS COMPLETED")?;

        let Some(token) = self.prompt_non_empty("Enter task ID to mark as completed: ")? else {
            return Ok(Step::Exit);
        };
        let Some(task) = self.lookup(&token)? else {
            return Ok(Step::Continue);
        };
        if task.status() == Status::Completed {
            writeln!(self.out, "\nTask '{}' is already completed.", task.title())?;
            return Ok(Step::Continue);
        }

        let updated = self.manager.mark_completed(task.id())?;
        writeln!(self.out, "\nTask marked as completed!")?;
        writeln!(self.out, "  Task: {}", updated.title())?;
        writeln!(self.out, "  Status: {}", updated.status())?;
        Ok(Step::Continue)
    }

    fn delete_task(&mut self) -> Result<Step> {
        self.section("DELETE TASK")?;

        let Some(token) = self.prompt_non_empty("Enter task ID to delete: ")? else {
            return Ok(Step::Exit);
        };
        let Some(task) = self.lookup(&token)? else {
            return Ok(Step::Continue);
        };
        writeln!(self.out, "\nTask to delete:")?;
        self.print_details(&task)?;

        let Some(answer) =
            self.prompt("\nAre you sure you want to delete this task? (yes/no): ")?
        else {
            return Ok(Step::Exit);
        };
        if matches!(answer.to_lowercase().as_str(), "yes" | "y") {
            self.manager.delete_task(task.id())?;
            writeln!(self.out, "\nTask deleted successfully!")?;
        } else {
            writeln!(self.out, "\nDeletion cancelled.")?;
        }
        Ok(Step::Continue)
    }

    fn view_task_details(&mut self) -> Result<Step> {
        self.section("VIEW TASK DETAILS")?;

        let Some(token) = self.prompt_non_empty("Enter task ID: ")? else {
            return Ok(Step::Exit);
        };
        if let Some(task) = self.lookup(&token)? {
            self.print_details(&task)?;
        }
        Ok(Step::Continue)
    }

    /// Resolve an id or prefix, reporting a miss to the user.
    fn lookup(&mut self, token: &str) -> Result<Option<Task>> {
        let task = self.manager.get_task_by_id(token).cloned();
        if task.is_none() {
            writeln!(self.out, "\nTask with ID '{token}' not found.")?;
        }
        Ok(task)
    }

    fn print_table(&mut self, tasks: &[Task]) -> Result<()> {
        let refs: Vec<&Task> = tasks.iter().collect();
        writeln!(self.out, "\n{}", format_task_table(&refs, self.display))?;
        Ok(())
    }

    fn print_details(&mut self, task: &Task) -> Result<()> {
        writeln!(self.out, "\n{}", format_task_details(task, self.display))?;
        Ok(())
    }

    /// One trimmed line, or `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.out, "{text}")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_non_empty(&mut self, text: &str) -> Result<Option<String>> {
        loop {
            match self.prompt(text)? {
                Some(value) if value.is_empty() => writeln!(self.out, "{MSG_EMPTY_INPUT}")?,
                other => return Ok(other),
            }
        }
    }

    fn prompt_valid_date(&mut self, text: &str) -> Result<Option<String>> {
        loop {
            let Some(value) = self.prompt_non_empty(text)? else {
                return Ok(None);
            };
            match validate_due_date(&value) {
                Ok(canonical) => return Ok(Some(canonical)),
                Err(_) => writeln!(self.out, "{MSG_INVALID_DATE}")?,
            }
        }
    }

    fn prompt_valid_priority(&mut self, text: &str) -> Result<Option<String>> {
        loop {
            let Some(value) = self.prompt_non_empty(text)? else {
                return Ok(None);
            };
            match Priority::parse(&value) {
                Ok(priority) => return Ok(Some(priority.as_str().to_string())),
                Err(_) => writeln!(self.out, "{MSG_INVALID_PRIORITY}")?,
            }
        }
    }
}
