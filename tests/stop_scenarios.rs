//! End-to-end stop decisions against a real state directory.
//!
//! Each test builds a fresh project root in a temp dir and drives
//! `StopEngine::decide` the way the stop hook does: once per stop attempt,
//! with state reloaded from disk every time.

use std::fs;
use std::path::{Path, PathBuf};

use claude_stop_guard::models::{ReinforcementState, VerificationLoop};
use claude_stop_guard::{Decision, StateStore, StopEngine};
use tempfile::TempDir;

const MAX_ATTEMPTS: u32 = 5;
const SESSION: &str = "sess-42";

struct Project {
    dir: TempDir,
    engine: StopEngine,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let engine = StopEngine::new(StateStore::new(dir.path().join("repo")), MAX_ATTEMPTS);
        Self { dir, engine }
    }

    fn store(&self) -> &StateStore {
        self.engine.store()
    }

    fn attempt_id(&self) -> String {
        self.store().attempt_id(SESSION)
    }

    fn transcript(&self, lines: &[&str]) -> PathBuf {
        let path = self.dir.path().join("transcript.jsonl");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn decide(&self, transcript: Option<&Path>, incomplete: u32) -> Decision {
        self.engine.decide(SESSION, transcript, incomplete)
    }

    fn loop_at(&self, iteration: u32, max_iterations: u32) {
        let mut state = VerificationLoop::start("migrate the config loader", max_iterations).unwrap();
        state.iteration = iteration;
        self.store().write_loop(SESSION, &state);
    }
}

fn assistant_line(text: &str) -> String {
    serde_json::json!({
        "type": "assistant",
        "message": {"content": [{"type": "text", "text": text}]}
    })
    .to_string()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_baseline_blocks_with_remaining_count() {
    let project = Project::new();

    let decision = project.decide(None, 3);

    assert!(decision.message().unwrap().contains("3"));
    assert_eq!(project.store().attempt_count(&project.attempt_id()), 1);
}

#[test]
fn test_verifier_approval_ends_loop_and_clears_modes() {
    let project = Project::new();
    project.loop_at(2, 5);
    project
        .store()
        .write_reinforcement(SESSION, &ReinforcementState::start("migrate", true));
    let line = assistant_line("<oracle-approved>VERIFIED_COMPLETE</oracle-approved>");
    let transcript = project.transcript(&[&line]);

    let decision = project.decide(Some(transcript.as_path()), 0);

    assert_eq!(decision, Decision::Allow);
    assert!(!project.store().loop_path(SESSION).exists());
    assert!(!project.store().reinforcement_path(SESSION).exists());
}

#[test]
fn test_verifier_rejection_advances_loop_with_feedback() {
    let project = Project::new();
    project.loop_at(4, 5);
    let line = assistant_line("Verification failed.\nIssue: missing tests");
    let transcript = project.transcript(&[&line]);

    let decision = project.decide(Some(transcript.as_path()), 0);

    assert!(!decision.is_allow());
    let state = project.store().read_loop(SESSION).unwrap();
    assert_eq!(state.iteration, 5);
    assert!(state.verifier_feedback.iter().any(|f| f.contains("missing tests")));
    assert!(decision.message().unwrap().contains("missing tests"));
}

#[test]
fn test_reinforcement_with_no_open_todos_allows() {
    let project = Project::new();
    let mut state = ReinforcementState::start("ship the release", false);
    state.reinforcement_count = 2;
    project.store().write_reinforcement(SESSION, &state);

    let decision = project.decide(None, 0);

    assert_eq!(decision, Decision::Allow);
    assert!(!project.store().reinforcement_path(SESSION).exists());
}

#[test]
fn test_loop_outranks_reinforcement() {
    let project = Project::new();
    project.loop_at(1, 5);
    let reinforcement = ReinforcementState::start("migrate", true);
    project.store().write_reinforcement(SESSION, &reinforcement);

    let decision = project.decide(None, 4);

    assert!(decision.message().unwrap().contains("ITERATION 2/5"));
    assert_eq!(project.store().read_reinforcement(SESSION).unwrap(), reinforcement);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_loop_without_signals_advances_exactly_one_iteration() {
    for (iteration, max) in [(1, 2), (1, 10), (3, 4), (7, 9)] {
        let project = Project::new();
        project.loop_at(iteration, max);

        assert!(!project.decide(None, 0).is_allow());
        assert_eq!(project.store().read_loop(SESSION).unwrap().iteration, iteration + 1);
    }
}

#[test]
fn test_loop_at_ceiling_allows_and_removes_mode_files() {
    for max in [1, 3, 10] {
        let project = Project::new();
        project.loop_at(max, max);
        project
            .store()
            .write_reinforcement(SESSION, &ReinforcementState::start("migrate", true));

        assert_eq!(project.decide(None, 2), Decision::Allow);
        assert!(!project.store().loop_path(SESSION).exists());
        assert!(!project.store().reinforcement_path(SESSION).exists());
    }
}

#[test]
fn test_deleting_absent_state_is_harmless() {
    let project = Project::new();
    project.store().delete_loop(SESSION);
    project.store().delete_reinforcement(SESSION);
    project.store().cleanup_attempt_files(&project.attempt_id());
    project.engine.clear_session(SESSION, &project.attempt_id());

    assert!(project.store().read_loop(SESSION).is_none());
}

#[test]
fn test_changed_todo_count_resets_attempts() {
    let project = Project::new();
    let attempt_id = project.attempt_id();
    project.decide(None, 3);
    project.decide(None, 3);
    project.decide(None, 3);
    assert_eq!(project.store().attempt_count(&attempt_id), 3);

    assert!(project.engine.detect_progress(&attempt_id, 2));
    assert_eq!(project.store().attempt_count(&attempt_id), 0);
    assert_eq!(project.store().todo_count(&attempt_id), Some(2));
}

#[test]
fn test_escape_hatch_after_max_attempts() {
    let project = Project::new();
    let attempt_id = project.attempt_id();

    for attempt in 1..=MAX_ATTEMPTS {
        let decision = project.decide(None, 2);
        assert!(!decision.is_allow(), "attempt {} should block", attempt);
    }

    assert_eq!(project.decide(None, 2), Decision::Allow);
    assert!(!project.store().attempts_path(&attempt_id).exists());
}

#[test]
fn test_sessions_and_projects_are_isolated() {
    let project = Project::new();
    let other_repo = StopEngine::new(
        StateStore::new(project.dir.path().join("other-repo")),
        MAX_ATTEMPTS,
    );
    project.loop_at(1, 3);

    assert!(project.engine.decide("someone-else", None, 0).is_allow());
    assert!(other_repo.decide(SESSION, None, 0).is_allow());
    assert_eq!(project.store().read_loop(SESSION).unwrap().iteration, 1);
}

#[test]
fn test_block_messages_do_not_feed_back_into_the_loop() {
    let project = Project::new();
    project.loop_at(1, 4);

    // Every continuation message lands in the transcript the next call scans.
    let first = project.decide(None, 0);
    let echoed = assistant_line(first.message().unwrap());
    let transcript = project.transcript(&[&echoed]);
    let second = project.decide(Some(transcript.as_path()), 0);

    assert!(!second.is_allow());
    let state = project.store().read_loop(SESSION).unwrap();
    assert_eq!(state.iteration, 3);
    assert!(state.verifier_feedback.is_empty());
}

#[test]
fn test_accumulated_block_messages_cannot_approve_the_loop() {
    let project = Project::new();
    project.loop_at(1, 5);

    let first = project.decide(None, 0);
    let second = project.decide(None, 0);
    let first_line = assistant_line(first.message().unwrap());
    let second_line = assistant_line(second.message().unwrap());
    let verdict = assistant_line("<oracle-approved>pending review</oracle-approved>");
    let transcript = project.transcript(&[&first_line, &second_line, &verdict]);

    let third = project.decide(Some(transcript.as_path()), 0);

    assert!(third.message().unwrap().contains("ITERATION 4/5"));
    assert_eq!(project.store().read_loop(SESSION).unwrap().iteration, 4);
}

/// Reinforcement and the baseline draw on one attempt budget. Blocks spent
/// before reinforcement started still count against it.
#[test]
fn test_reinforcement_shares_baseline_attempt_budget() {
    let project = Project::new();

    for _ in 0..3 {
        assert!(!project.decide(None, 3).is_allow());
    }
    project
        .store()
        .write_reinforcement(SESSION, &ReinforcementState::start("finish", false));

    for _ in 0..(MAX_ATTEMPTS - 3) {
        assert!(project.decide(None, 3).message().unwrap().contains("REINFORCEMENT"));
    }

    assert_eq!(project.decide(None, 3), Decision::Allow);
    assert!(project.store().read_reinforcement(SESSION).is_none());
}
