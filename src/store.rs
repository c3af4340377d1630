//! On-disk state for the stop hook.
//!
//! Mode state and attempt counters live under `<project>/.claude/stop-guard/`:
//!
//! - `loop-{session}.json`: verification loop state
//! - `reinforce-{session}.json`: reinforcement mode state
//! - `attempts-{attempt_id}`: consecutive continuation blocks
//! - `todo-count-{attempt_id}`: incomplete todo count seen on the last call
//!
//! Reinforcement state written by older releases under `~/.claude/stop-guard/`
//! is still honoured on read. Every read fails soft to "absent" and every write
//! fails soft with a log entry, so the stop hook can never crash on state I/O.

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::GuardConfig;
use crate::error::{Result, StopGuardError};
use crate::logging::log_quiet;
use crate::models::{ReinforcementState, VerificationLoop};

const STATE_DIR: &str = "stop-guard";
const LOOP_PREFIX: &str = "loop-";
const REINFORCE_PREFIX: &str = "reinforce-";
const ATTEMPTS_PREFIX: &str = "attempts-";
const TODO_COUNT_PREFIX: &str = "todo-count-";

/// Session id used by callers that have no real session
pub const DEFAULT_SESSION_ID: &str = "default";

/// File-backed state scoped to one project root.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
    state_dir: PathBuf,
    legacy_dirs: Vec<PathBuf>,
    stale_after: Option<Duration>,
}

impl StateStore {
    /// Store rooted at `root` with no legacy locations and no staleness window.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(".claude").join(STATE_DIR);
        Self {
            root,
            state_dir,
            legacy_dirs: Vec::new(),
            stale_after: None,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &GuardConfig) -> Self {
        Self::new(root)
            .with_legacy_dirs(config.legacy_state_dirs())
            .with_stale_after(config.stale_after())
    }

    pub fn with_legacy_dirs(mut self, legacy_dirs: Vec<PathBuf>) -> Self {
        self.legacy_dirs = legacy_dirs;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    // ------------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------------

    pub fn loop_path(&self, session_id: &str) -> PathBuf {
        self.state_dir
            .join(format!("{}{}.json", LOOP_PREFIX, file_key(session_id)))
    }

    pub fn reinforcement_path(&self, session_id: &str) -> PathBuf {
        reinforcement_file(&self.state_dir, session_id)
    }

    /// Candidate reinforcement files in lookup order: project first, then legacy.
    fn reinforcement_candidates(&self, session_id: &str) -> Vec<PathBuf> {
        std::iter::once(self.reinforcement_path(session_id))
            .chain(
                self.legacy_dirs
                    .iter()
                    .map(|dir| reinforcement_file(dir, session_id)),
            )
            .collect()
    }

    pub fn attempts_path(&self, attempt_id: &str) -> PathBuf {
        self.state_dir.join(format!("{}{}", ATTEMPTS_PREFIX, attempt_id))
    }

    pub fn todo_count_path(&self, attempt_id: &str) -> PathBuf {
        self.state_dir
            .join(format!("{}{}", TODO_COUNT_PREFIX, attempt_id))
    }

    /// Escape-hatch identity for a session.
    ///
    /// Real sessions use their own id. The placeholder session falls back to a
    /// hash of the project root so repeated calls from one directory share a
    /// budget.
    pub fn attempt_id(&self, session_id: &str) -> String {
        if session_id.is_empty() || session_id == DEFAULT_SESSION_ID {
            format!("cwd-{}", content_hash(&self.root.to_string_lossy()))
        } else {
            file_key(session_id)
        }
    }

    // ------------------------------------------------------------------------
    // Verification loop
    // ------------------------------------------------------------------------

    pub fn read_loop(&self, session_id: &str) -> Option<VerificationLoop> {
        let path = self.loop_path(session_id);
        let state: VerificationLoop = read_json(&path)?;
        if !state.active {
            return None;
        }
        if self.is_stale(state.last_activity()) {
            log_quiet("stale-state", format!("removed {}", path.display()), true);
            remove_quietly(&path);
            return None;
        }
        Some(state)
    }

    pub fn write_loop(&self, session_id: &str, state: &VerificationLoop) {
        write_json_quietly(&self.loop_path(session_id), state);
    }

    pub fn delete_loop(&self, session_id: &str) {
        remove_quietly(&self.loop_path(session_id));
    }

    // ------------------------------------------------------------------------
    // Reinforcement mode
    // ------------------------------------------------------------------------

    /// The first candidate file that parses decides the result.
    pub fn read_reinforcement(&self, session_id: &str) -> Option<ReinforcementState> {
        let (path, state) = self
            .reinforcement_candidates(session_id)
            .into_iter()
            .find_map(|path| read_json::<ReinforcementState>(&path).map(|state| (path, state)))?;

        if !state.active {
            return None;
        }
        if self.is_stale(state.last_activity()) {
            log_quiet("stale-state", format!("removed {}", path.display()), true);
            remove_quietly(&path);
            return None;
        }
        Some(state)
    }

    pub fn write_reinforcement(&self, session_id: &str, state: &ReinforcementState) {
        write_json_quietly(&self.reinforcement_path(session_id), state);
    }

    pub fn delete_reinforcement(&self, session_id: &str) {
        for path in self.reinforcement_candidates(session_id) {
            remove_quietly(&path);
        }
    }

    // ------------------------------------------------------------------------
    // Attempt counters
    // ------------------------------------------------------------------------

    pub fn attempt_count(&self, attempt_id: &str) -> u32 {
        read_counter(&self.attempts_path(attempt_id)).unwrap_or(0)
    }

    /// Bump the counter and return its new value.
    pub fn increment_attempts(&self, attempt_id: &str) -> u32 {
        let next = self.attempt_count(attempt_id).saturating_add(1);
        write_quietly(&self.attempts_path(attempt_id), &next.to_string());
        next
    }

    pub fn reset_attempts(&self, attempt_id: &str) {
        remove_quietly(&self.attempts_path(attempt_id));
    }

    pub fn todo_count(&self, attempt_id: &str) -> Option<u32> {
        read_counter(&self.todo_count_path(attempt_id))
    }

    pub fn save_todo_count(&self, attempt_id: &str, count: u32) {
        write_quietly(&self.todo_count_path(attempt_id), &count.to_string());
    }

    pub fn cleanup_attempt_files(&self, attempt_id: &str) {
        remove_quietly(&self.attempts_path(attempt_id));
        remove_quietly(&self.todo_count_path(attempt_id));
    }

    fn is_stale(&self, last_activity: Option<chrono::DateTime<Utc>>) -> bool {
        match (self.stale_after, last_activity) {
            (Some(window), Some(at)) => Utc::now().signed_duration_since(at) > window,
            _ => false,
        }
    }
}

fn reinforcement_file(dir: &Path, session_id: &str) -> PathBuf {
    dir.join(format!("{}{}.json", REINFORCE_PREFIX, file_key(session_id)))
}

/// Make a session id safe to embed in a file name.
fn file_key(session_id: &str) -> String {
    if session_id.is_empty() {
        return DEFAULT_SESSION_ID.to_string();
    }
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Short stable hash: first 8 bytes of SHA-256 as 16 hex chars.
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    if content.trim().is_empty() {
        return None;
    }
    serde_json::from_str(&content).ok()
}

fn read_counter(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Write via a uniquely named temp file in the same directory, then rename.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StopGuardError::State(format!("no parent directory for {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "state".to_string());
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    fs::write(&tmp_path, contents)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

fn write_quietly(path: &Path, contents: &str) {
    if let Err(e) = write_atomic(path, contents) {
        log_quiet("write-state", format!("{}: {}", path.display(), e), false);
    }
}

fn write_json_quietly<T: Serialize>(path: &Path, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(content) => write_quietly(path, &content),
        Err(e) => log_quiet("write-state", format!("{}: {}", path.display(), e), false),
    }
}

fn remove_quietly(path: &Path) {
    let _ = fs::remove_file(path);
}
