//! Colored terminal output for the command line client.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;
use serde_json::Value;

use crate::stream::EventRecord;
use crate::watcher::WatcherStatus;

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length of a summary detail in non-raw mode.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to `max_len` characters, adding an ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{head}...")
}

/// Account fields that name whoever caused an event, in lookup order.
const ACTOR_FIELDS: [&str; 7] = [
    "author",
    "uploader",
    "submitter",
    "abandoner",
    "restorer",
    "changer",
    "reviewer",
];

fn field<'a>(record: &'a EventRecord, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(record.get(*first)?, |value, key| value.get(key))
}

fn field_str(record: &EventRecord, path: &[&str]) -> Option<String> {
    match field(record, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// The `type` of an event, or `unknown`.
#[must_use]
pub fn event_type(record: &EventRecord) -> &str {
    record
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// One-line description of an event: project, change, patch set and actor.
#[must_use]
pub fn event_summary(record: &EventRecord, raw_mode: bool) -> String {
    let mut parts = Vec::new();
    if let Some(project) = field_str(record, &["change", "project"])
        .or_else(|| field_str(record, &["refUpdate", "project"]))
        .or_else(|| field_str(record, &["projectName"]))
    {
        parts.push(format!("project={project}"));
    }
    if let Some(number) = field_str(record, &["change", "number"]) {
        match field_str(record, &["patchSet", "number"]) {
            Some(patch_set) => parts.push(format!("change={number},{patch_set}")),
            None => parts.push(format!("change={number}")),
        }
    }
    if let Some(reference) = field_str(record, &["refUpdate", "refName"]) {
        parts.push(format!("ref={reference}"));
    }
    let actor = ACTOR_FIELDS.iter().find_map(|&who| {
        field_str(record, &[who, "username"]).or_else(|| field_str(record, &[who, "name"]))
    });
    if let Some(actor) = actor {
        parts.push(format!("by={actor}"));
    }
    if let Some(subject) = field_str(record, &["change", "subject"]) {
        parts.push(truncate(&subject, DEFAULT_MAX_LEN, raw_mode));
    }
    parts.join(" ")
}

/// Print one event. Raw mode prints the JSON line unchanged.
pub fn print_event(record: &EventRecord, raw_mode: bool) {
    if raw_mode {
        println!("{}", Value::Object(record.clone()));
    } else {
        println!(
            "{} {} {}",
            timestamp().dimmed(),
            format!("[{}]", event_type(record)).yellow().bold(),
            event_summary(record, raw_mode)
        );
    }
    let _ = io::stdout().flush();
}

/// Print a watcher status change to stderr.
pub fn print_status(status: WatcherStatus) {
    let label = status.to_string();
    let label = match status {
        WatcherStatus::Consuming | WatcherStatus::Connected => label.green().to_string(),
        WatcherStatus::Connecting | WatcherStatus::Idle => label.cyan().to_string(),
        WatcherStatus::Disconnected => label.yellow().to_string(),
        WatcherStatus::Dead => label.red().bold().to_string(),
    };
    eprintln!("{} {} {}", timestamp().dimmed(), "[WATCHER]".blue().bold(), label);
}

/// Print an error message to stderr.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
