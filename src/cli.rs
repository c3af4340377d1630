// CLI Parser - Clap derive definitions

use clap::{Parser, Subcommand};

use crate::models::DEFAULT_COMPLETION_PROMISE;
use crate::store::DEFAULT_SESSION_ID;

/// Claude Stop Guard: keeps sessions working until tracked work is verified
#[derive(Parser, Debug)]
#[command(name = "claude-stop-guard")]
#[command(version)]
#[command(about = "Stop-hook decision engine for Claude Code sessions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stop hook: read the hook payload from stdin and print the decision
    Stop,

    /// Start a verification loop for a session
    StartLoop {
        /// The task the loop must finish
        prompt: String,
        /// Iteration ceiling (defaults to the configured value)
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Token the agent must echo inside the promise tag
        #[arg(long, default_value = DEFAULT_COMPLETION_PROMISE)]
        promise: String,
        /// Also start reinforcement mode, linked to this loop
        #[arg(long)]
        with_reinforcement: bool,
        /// Claude session ID
        #[arg(long, env = "CLAUDE_SESSION_ID", default_value = DEFAULT_SESSION_ID)]
        session: String,
    },

    /// Start reinforcement mode for a session
    StartReinforce {
        /// The task to keep reinforcing
        prompt: String,
        /// Claude session ID
        #[arg(long, env = "CLAUDE_SESSION_ID", default_value = DEFAULT_SESSION_ID)]
        session: String,
    },

    /// Show mode state and attempt counters for a session
    Status {
        /// Claude session ID
        #[arg(long, env = "CLAUDE_SESSION_ID", default_value = DEFAULT_SESSION_ID)]
        session: String,
    },

    /// Remove every mode and counter for a session
    Cancel {
        /// Claude session ID
        #[arg(long, env = "CLAUDE_SESSION_ID", default_value = DEFAULT_SESSION_ID)]
        session: String,
    },

    /// View operation logs
    Logs {
        /// Number of log entries
        #[arg(default_value = "50")]
        n: usize,
        /// Filter by operation type
        operation: Option<String>,
    },

    /// Clear all logs
    ClearLogs,
}

// ============================================================================
// Tests
// ============================================================================
