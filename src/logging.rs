//! File-based operation log for stop decisions and state failures.
//!
//! Logs to `~/.claude/logs/stop-guard.log` with 1MB rotation.

use crate::error::{Result, StopGuardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const LOG_FILE_NAME: &str = "stop-guard.log";
const LOG_DIR_NAME: &str = "logs";
const MAX_LOG_SIZE: u64 = 1_048_576; // 1MB

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub details: Option<String>,
    pub success: bool,
}

impl LogEntry {
    pub fn new(operation: impl Into<String>, details: Option<String>, success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.into(),
            details,
            success,
        }
    }

    /// Format as a single log line. Newlines in details are flattened.
    pub fn to_log_line(&self) -> String {
        let status = if self.success { "OK" } else { "ERR" };
        let details = self
            .details
            .as_deref()
            .map(|d| d.replace('\n', " "))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            status,
            self.operation,
            details
        )
    }

    /// Parse from a log line.
    pub fn from_log_line(line: &str) -> Option<Self> {
        // Format: [2024-01-24 10:30:45] OK decide rule=pending-work outcome=block
        let rest = line.strip_prefix('[')?;
        let timestamp_end = rest.find(']')?;
        let timestamp_str = &rest[..timestamp_end];

        let rest = rest.get(timestamp_end + 1..)?.trim();
        let mut parts = rest.splitn(3, ' ');
        let status = parts.next()?;
        let operation = parts.next()?.to_string();
        let details = parts.next().map(str::to_string).filter(|s| s != "-");

        let timestamp = chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc())?;

        Some(Self {
            timestamp,
            operation,
            details,
            success: status == "OK",
        })
    }
}

/// Get the log file path, creating the log directory if needed.
pub fn get_log_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StopGuardError::Config("Could not determine home directory".to_string()))?;

    let log_dir = home.join(".claude").join(LOG_DIR_NAME);
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    Ok(log_dir.join(LOG_FILE_NAME))
}

fn needs_rotation(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.len() >= MAX_LOG_SIZE)
        .unwrap_or(false)
}

/// Rotate log file (rename to .old, start fresh).
fn rotate_log(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let old_path = path.with_extension("log.old");
    if old_path.exists() {
        fs::remove_file(&old_path)?;
    }
    fs::rename(path, &old_path)?;

    Ok(())
}

/// Write a log entry.
pub fn log(operation: impl Into<String>, details: Option<String>, success: bool) -> Result<()> {
    let path = get_log_path()?;
    append_entry(&path, &LogEntry::new(operation, details, success))
}

/// Write a log entry, ignoring any failure to do so.
///
/// Used from the stop path, where logging must never change the decision.
pub fn log_quiet(operation: &str, details: impl Into<String>, success: bool) {
    let _ = log(operation, Some(details.into()), success);
}

fn append_entry(path: &Path, entry: &LogEntry) -> Result<()> {
    if needs_rotation(path) {
        rotate_log(path)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", entry.to_log_line())?;
    writer.flush()?;

    Ok(())
}

/// Read log entries, most recent first.
///
/// - `limit`: Maximum number of entries to return
/// - `operation`: Optional filter by operation name
pub fn read_logs(limit: usize, operation: Option<&str>) -> Result<Vec<LogEntry>> {
    let path = get_log_path()?;
    read_logs_from(&path, limit, operation)
}

fn read_logs_from(path: &Path, limit: usize, operation: Option<&str>) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut entries: Vec<LogEntry> = reader
        .lines()
        .map_while(|line| line.ok())
        .filter_map(|line| LogEntry::from_log_line(&line))
        .filter(|entry| operation.map_or(true, |op| entry.operation.eq_ignore_ascii_case(op)))
        .collect();

    entries.reverse();
    entries.truncate(limit);

    Ok(entries)
}

/// Clear all logs, returning the number of lines removed.
pub fn clear_logs() -> Result<usize> {
    let path = get_log_path()?;

    if !path.exists() {
        return Ok(0);
    }

    let count = BufReader::new(File::open(&path)?).lines().count();
    File::create(&path)?;

    let old_path = path.with_extension("log.old");
    if old_path.exists() {
        fs::remove_file(&old_path)?;
    }

    Ok(count)
}
