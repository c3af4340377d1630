//! Continuation messages injected when a stop is blocked.
//!
//! These strings end up in the transcript that the next invocation scans, so
//! they must never contain a complete marker tag or any of the rejection
//! phrases the transcript analyzer looks for.

use crate::models::{ReinforcementState, VerificationLoop};
use crate::transcript::TranscriptSignals;

fn todo_count_text(count: u32) -> String {
    if count == 1 {
        "1 todo".to_string()
    } else {
        format!("{} todos", count)
    }
}

/// Message for a blocked stop inside a verification loop.
///
/// `state` is the already-advanced loop state.
pub fn verification_continuation(state: &VerificationLoop, signals: &TranscriptSignals) -> String {
    let mut lines = vec![
        format!(
            "[VERIFICATION LOOP - ITERATION {}/{}]",
            state.iteration, state.max_iterations
        ),
        String::new(),
    ];

    if signals.completion_claimed {
        lines.push(
            "You emitted the completion promise, but no verifier approval was found.".to_string(),
        );
    } else {
        lines.push("The verifier has not approved this work yet.".to_string());
    }

    if !state.prompt.trim().is_empty() {
        lines.push(String::new());
        lines.push("Original task:".to_string());
        lines.push(state.prompt.trim().to_string());
    }

    if !state.verifier_feedback.is_empty() {
        lines.push(String::new());
        lines.push("Verifier feedback so far:".to_string());
        for (i, feedback) in state.verifier_feedback.iter().enumerate() {
            let text = if feedback.trim().is_empty() {
                "(no details given)"
            } else {
                feedback.trim()
            };
            lines.push(format!("{}. {}", i + 1, text));
        }
    }

    lines.push(String::new());
    lines.push("Before stopping again:".to_string());
    lines.push("1. Address all verifier feedback and re-check the original task end to end.".to_string());
    lines.push("2. Ask the verifier (oracle) to review the result again.".to_string());
    lines.push(
        "3. Its approval must put VERIFIED_COMPLETE inside an oracle-approved tag.".to_string(),
    );
    lines.push(format!(
        "4. Then output {} inside a promise tag.",
        state.completion_promise
    ));

    lines.join("\n")
}

/// Message for a blocked stop while reinforcement mode has open todos.
///
/// `state` is the already-reinforced mode state.
pub fn reinforcement_continuation(state: &ReinforcementState, incomplete: u32) -> String {
    let mut lines = vec![
        format!(
            "[REINFORCEMENT #{}] {} still open.",
            state.reinforcement_count,
            todo_count_text(incomplete)
        ),
        String::new(),
        "Reinforcement mode stays on until every tracked todo is finished:".to_string(),
        "- Do not stop while todos remain open; pick the next one and keep going.".to_string(),
        "- Mark each todo completed as soon as it is done, never in batches.".to_string(),
        "- Run the build and tests before calling anything finished.".to_string(),
    ];

    if state.linked_to_loop {
        lines.push("- This run is paired with a verification loop; the verifier has the final say.".to_string());
    }

    if !state.original_prompt.trim().is_empty() {
        lines.push(String::new());
        lines.push(format!("Original task: {}", state.original_prompt.trim()));
    }

    lines.join("\n")
}

/// Baseline message when todos remain and no mode is active.
pub fn pending_work(incomplete: u32, attempt: u32, max_attempts: u32) -> String {
    format!(
        "[TODO CONTINUATION {}/{}] {} remaining. Continue with the next pending task and mark it completed when done. Stop only when the todo list is empty.",
        attempt,
        max_attempts,
        todo_count_text(incomplete)
    )
}
