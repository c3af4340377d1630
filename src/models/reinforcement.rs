//! Reinforcement mode state.
//!
//! Keeps re-injecting the operating rules until every tracked todo is done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementState {
    pub active: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_prompt: String,
    #[serde(default)]
    pub reinforcement_count: u32,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Started alongside a verification loop
    #[serde(default)]
    pub linked_to_loop: bool,
}

impl ReinforcementState {
    pub fn start(original_prompt: impl Into<String>, linked_to_loop: bool) -> Self {
        let now = Utc::now();
        Self {
            active: true,
            started_at: Some(now),
            original_prompt: original_prompt.into(),
            reinforcement_count: 0,
            last_checked_at: Some(now),
            linked_to_loop,
        }
    }

    /// Record one more blocked stop.
    pub fn reinforce(&mut self) {
        self.reinforcement_count = self.reinforcement_count.saturating_add(1);
        self.last_checked_at = Some(Utc::now());
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at.or(self.started_at)
    }
}
