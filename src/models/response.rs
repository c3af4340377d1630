use serde::Serialize;

use super::reinforcement::ReinforcementState;
use super::verification::VerificationLoop;

// ============================================================================
// Base Response Types
// ============================================================================

/// Wrapper for successful responses with data
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

// ============================================================================
// State Responses
// ============================================================================

/// Snapshot of everything the stop hook would see for a session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub session_id: String,
    pub attempt_id: String,
    pub verification_loop: Option<VerificationLoop>,
    pub reinforcement: Option<ReinforcementState>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_todo_count: Option<u32>,
    pub pending_todos: u32,
}

/// Response after a mode was started
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedData {
    pub session_id: String,
    pub mode: String,
}

/// Response after cancelling every mode for a session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelData {
    pub session_id: String,
    pub cancelled: bool,
}

// ============================================================================
// Log Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub operation: String,
    #[serde(flatten)]
    pub details: serde_json::Value,
}

/// Response for reading logs
#[derive(Debug, Serialize)]
pub struct LogsData {
    pub entries: Vec<LogEntry>,
    pub count: usize,
}

/// Response for clearing logs
#[derive(Debug, Serialize)]
pub struct ClearLogsData {
    pub cleared: usize,
}
