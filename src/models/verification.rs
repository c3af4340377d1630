//! Verification loop state.
//!
//! A bounded retry loop: every blocked stop advances `iteration`, and the
//! loop only ends when an external verifier approves or the ceiling is hit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StopGuardError};

/// Token the agent echoes inside the completion tag by default
pub const DEFAULT_COMPLETION_PROMISE: &str = "DONE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationLoop {
    pub active: bool,
    pub iteration: u32,
    pub max_iterations: u32,
    #[serde(default = "default_promise")]
    pub completion_promise: String,
    #[serde(default)]
    pub prompt: String,
    /// Verifier feedback, one entry per rejected iteration
    #[serde(default)]
    pub verifier_feedback: Vec<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_promise() -> String {
    DEFAULT_COMPLETION_PROMISE.to_string()
}

impl VerificationLoop {
    /// Start a new loop at iteration 1.
    pub fn start(prompt: impl Into<String>, max_iterations: u32) -> Result<Self> {
        if max_iterations == 0 {
            return Err(StopGuardError::InvalidMaxIterations(max_iterations));
        }
        let now = Utc::now();
        Ok(Self {
            active: true,
            iteration: 1,
            max_iterations,
            completion_promise: default_promise(),
            prompt: prompt.into(),
            verifier_feedback: Vec::new(),
            started_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn ceiling_reached(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Advance one iteration, recording verifier feedback when present.
    pub fn advance(&mut self, feedback: Option<String>) {
        self.iteration = self.iteration.saturating_add(1);
        if let Some(feedback) = feedback {
            self.verifier_feedback.push(feedback);
        }
        self.updated_at = Some(Utc::now());
    }

    /// Most recent activity timestamp
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.started_at)
    }
}
