//! Pending todo count for a session.
//!
//! Claude Code keeps each session's todo list as a JSON array in
//! `~/.claude/todos/{session_id}.json` or `{session_id}-*.json`. Entries
//! whose status is neither `completed` nor `cancelled` count as incomplete
//! work.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TodoItem {
    #[serde(default)]
    status: Option<String>,
}

impl TodoItem {
    fn is_open(&self) -> bool {
        !matches!(
            self.status.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("completed") | Some("cancelled")
        )
    }
}

/// Count open todos across every todo file belonging to `session_id`.
///
/// Unreadable directories and malformed files count as zero.
pub fn count_incomplete_todos(todos_dir: &Path, session_id: &str) -> u32 {
    if session_id.is_empty() {
        return 0;
    }

    let Ok(entries) = fs::read_dir(todos_dir) else {
        return 0;
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| belongs_to_session(&entry.file_name().to_string_lossy(), session_id))
        .map(|entry| count_file(&entry.path()))
        .fold(0u32, |total, n| total.saturating_add(n))
}

fn belongs_to_session(file_name: &str, session_id: &str) -> bool {
    match file_name
        .strip_suffix(".json")
        .and_then(|stem| stem.strip_prefix(session_id))
    {
        Some(rest) => rest.is_empty() || rest.starts_with('-'),
        None => false,
    }
}

fn count_file(path: &Path) -> u32 {
    let items: Vec<TodoItem> = match fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
    {
        Some(items) => items,
        None => return 0,
    };
    let open = items.iter().filter(|item| item.is_open()).count();
    u32::try_from(open).unwrap_or(u32::MAX)
}
