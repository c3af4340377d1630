pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod models;
pub mod store;
pub mod todos;
pub mod transcript;

pub use cli::{Cli, Command};
pub use config::GuardConfig;
pub use engine::{classify, Decision, Rule, StopEngine};
pub use error::{Result, StopGuardError};
pub use hooks::{handle_stop, HookInput, HookOutput};
pub use logging::{clear_logs, log, log_quiet, read_logs, LogEntry};
pub use store::{StateStore, DEFAULT_SESSION_ID};
pub use todos::count_incomplete_todos;
pub use transcript::{analyze_transcript, TranscriptSignals};
