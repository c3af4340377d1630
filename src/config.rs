use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::error::{Result, StopGuardError};

/// Stop guard configuration loaded from ~/.claude/config/stop-guard.json
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Consecutive continuation blocks allowed before the escape hatch opens
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Minutes of inactivity after which mode state is discarded (0 = never)
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,
    /// Iteration ceiling used by `start-loop` when none is given
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: u32,
    /// Directory holding per-session todo lists (defaults to ~/.claude/todos)
    #[serde(default)]
    pub todos_dir: Option<PathBuf>,
    /// Legacy reinforcement state locations consulted on read
    #[serde(default)]
    pub legacy_state_dirs: Option<Vec<PathBuf>>,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_stale_after_minutes() -> u64 {
    120
}

fn default_max_iterations() -> u32 {
    10
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            stale_after_minutes: default_stale_after_minutes(),
            default_max_iterations: default_max_iterations(),
            todos_dir: None,
            legacy_state_dirs: None,
        }
    }
}

impl GuardConfig {
    /// Load config from the standard location (~/.claude/config/stop-guard.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                StopGuardError::Config(format!("Failed to read config file: {}", e))
            })?;
            let config: GuardConfig = serde_json::from_str(&content).map_err(|e| {
                StopGuardError::Config(format!("Failed to parse config JSON: {}", e))
            })?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the standard config file path
    pub fn config_path() -> PathBuf {
        claude_home().join("config").join("stop-guard.json")
    }

    /// Resolved todo directory
    pub fn todos_dir(&self) -> PathBuf {
        self.todos_dir
            .clone()
            .unwrap_or_else(|| claude_home().join("todos"))
    }

    /// Resolved legacy reinforcement state directories, in lookup order
    pub fn legacy_state_dirs(&self) -> Vec<PathBuf> {
        self.legacy_state_dirs
            .clone()
            .unwrap_or_else(|| vec![claude_home().join("stop-guard")])
    }

    /// Staleness window, `None` when disabled
    pub fn stale_after(&self) -> Option<chrono::Duration> {
        if self.stale_after_minutes == 0 {
            None
        } else {
            i64::try_from(self.stale_after_minutes)
                .ok()
                .map(chrono::Duration::minutes)
        }
    }
}

/// `~/.claude`, falling back to `./.claude` when no home directory is known
pub fn claude_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
}

// ============================================================================
// Tests
// ============================================================================
