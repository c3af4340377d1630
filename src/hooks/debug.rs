//! Debug trace for hook handlers.
//!
//! Off unless `STOP_GUARD_DEBUG` is set. Each hook gets its own log file at
//! `/tmp/stop-guard-{hook_name}-hook.log`.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;

pub const DEBUG_ENV: &str = "STOP_GUARD_DEBUG";

pub fn enabled() -> bool {
    std::env::var_os(DEBUG_ENV).is_some()
}

/// Get log file path for a specific hook
pub fn get_log_path(hook_name: &str) -> String {
    format!("/tmp/stop-guard-{}-hook.log", hook_name)
}

pub fn debug(hook_name: &str, msg: &str) {
    if enabled() {
        write_line(&get_log_path(hook_name), hook_name, msg);
    }
}

fn write_line(log_path: &str, hook_name: &str, msg: &str) {
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let line = format!("[{}] [{}] {}\n", timestamp, hook_name, msg);
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
        let _ = file.write_all(line.as_bytes());
    }
}
