//! Shared output formatting for tasktrack commands and the shell.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::error::{Error, Result};
use crate::task::{Task, DATE_FORMAT};

pub const SCHEMA_VERSION: &str = "tasktrack.v1";

const TITLE_WIDTH: usize = 25;
const TABLE_RULE_WIDTH: usize = 120;
const DETAIL_RULE_WIDTH: usize = 60;
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: err.kind(),
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// First positional argument, or `shell` when there is none.
pub fn infer_command_name_from_args() -> String {
    let mut args = std::env::args().skip(1);
    let mut skip_value = false;
    while let Some(arg) = args.next() {
        if skip_value {
            skip_value = false;
            continue;
        }
        if matches!(arg.as_str(), "--config" | "--data-dir" | "--events") {
            skip_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "shell".to_string()
}

/// Fixed-width table, one row per task.
pub fn format_task_table(tasks: &[&Task], display: &DisplayConfig) -> String {
    let rule = "-".repeat(TABLE_RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        format!(
            "{:<20} {:<25} {:<10} {:<15} {:<12} {:<18}",
            "Task ID", "Title", "Priority", "Status", "Due Date", "Created"
        ),
        rule.clone(),
    ];
    for task in tasks {
        lines.push(format!(
            "{:<20} {:<25} {:<10} {:<15} {:<12} {:<18}",
            task.id(),
            truncate_title(task.title()),
            task.priority().as_str(),
            task.status().as_str(),
            format_due_date(task, &display.date_format),
            task.created_at().format(CREATED_FORMAT).to_string()
        ));
    }
    lines.push(rule);
    lines.join("\n")
}

/// Labelled block showing every field of one task.
pub fn format_task_details(task: &Task, display: &DisplayConfig) -> String {
    let rule = "=".repeat(DETAIL_RULE_WIDTH);
    [
        rule.clone(),
        format!("Task ID:     {}", task.id()),
        format!("Title:       {}", task.title()),
        format!("Description: {}", task.description()),
        format!("Priority:    {}", task.priority()),
        format!("Status:      {}", task.status()),
        format!("Due Date:    {}", format_due_date(task, &display.date_format)),
        format!(
            "Created:     {}",
            task.created_at().format(&display.datetime_format)
        ),
        rule,
    ]
    .join("\n")
}

fn format_due_date(task: &Task, date_format: &str) -> String {
    NaiveDate::parse_from_str(task.due_date(), DATE_FORMAT)
        .map(|date| date.format(date_format).to_string())
        .unwrap_or_else(|_| task.due_date().to_string())
}

pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let kept: String = title.chars().take(TITLE_WIDTH - 3).collect();
    format!("{kept}...")
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::NotFound(_) => vec!["tasktrack list".to_string()],
        Error::Connection(_) => vec![
            "close the other tasktrack session or raise store.connect_timeout_ms".to_string(),
        ],
        Error::InvalidConfig(_) => vec!["fix tasktrack.toml then retry".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}
