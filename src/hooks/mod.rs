//! Hook handlers for Claude Code settings.json integration.
//!
//! Each hook reads JSON from stdin and outputs JSON with decision/reason fields.

pub mod debug;
pub mod stop;

pub use stop::handle_stop;

use serde::{Deserialize, Serialize};

use crate::engine::Decision;
use crate::store::DEFAULT_SESSION_ID;

/// Standard input format for hooks (from Claude Code)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    /// Claude's session identifier
    #[serde(alias = "sessionId")]
    pub session_id: Option<String>,
    /// Path to transcript file
    #[serde(alias = "transcriptPath")]
    pub transcript_path: Option<String>,
    /// Current working directory
    pub cwd: Option<String>,
    /// Hook event name
    pub hook_event_name: Option<String>,
    /// Set by Claude Code when the stop was already blocked once this turn
    #[serde(default)]
    pub stop_hook_active: Option<bool>,
}

impl HookInput {
    /// Session id, or the placeholder when Claude Code sent none.
    pub fn session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
    }
}

/// Standard output format for hooks
#[derive(Debug, Clone, Serialize)]
pub struct HookOutput {
    /// Decision: "approve" or "block"
    pub decision: String,
    /// Continuation instructions when blocking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HookOutput {
    pub fn approve() -> Self {
        Self {
            decision: "approve".to_string(),
            reason: None,
        }
    }

    pub fn block(reason: String) -> Self {
        Self {
            decision: "block".to_string(),
            reason: Some(reason),
        }
    }
}

impl From<Decision> for HookOutput {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow => Self::approve(),
            Decision::Block(message) => Self::block(message),
        }
    }
}
