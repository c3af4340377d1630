//! Stop decision engine.
//!
//! One call to [`StopEngine::decide`] per stop attempt. The engine loads mode
//! state fresh from disk, picks the first matching [`Rule`], applies that
//! rule's state changes and returns either [`Decision::Allow`] or a blocking
//! continuation message. It never returns an error: state that cannot be read
//! counts as absent and state that cannot be written is logged and skipped.

pub mod messages;

use std::path::Path;

use crate::logging::log_quiet;
use crate::models::{ReinforcementState, VerificationLoop};
use crate::store::StateStore;
use crate::transcript::analyze_transcript;

/// Outcome of one stop attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block(String),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Block(message) => Some(message.as_str()),
        }
    }
}

/// Which branch governs a stop attempt, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// A verification loop is active; it outranks everything else.
    VerificationLoop,
    /// Reinforcement mode with todos still open.
    ReinforcementPending,
    /// Reinforcement mode and every todo is done.
    ReinforcementFinished,
    /// No mode, but todos remain.
    PendingWork,
    Idle,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::VerificationLoop => "verification-loop",
            Rule::ReinforcementPending => "reinforcement-pending",
            Rule::ReinforcementFinished => "reinforcement-finished",
            Rule::PendingWork => "pending-work",
            Rule::Idle => "idle",
        }
    }
}

/// Pick the governing rule for a combination of active modes and open work.
pub fn classify(loop_active: bool, reinforcement_active: bool, incomplete: u32) -> Rule {
    if loop_active {
        Rule::VerificationLoop
    } else if reinforcement_active && incomplete > 0 {
        Rule::ReinforcementPending
    } else if reinforcement_active {
        Rule::ReinforcementFinished
    } else if incomplete > 0 {
        Rule::PendingWork
    } else {
        Rule::Idle
    }
}

pub struct StopEngine {
    store: StateStore,
    max_attempts: u32,
}

impl StopEngine {
    pub fn new(store: StateStore, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide whether the session may stop.
    pub fn decide(&self, session_id: &str, transcript_path: Option<&Path>, incomplete: u32) -> Decision {
        let attempt_id = self.store.attempt_id(session_id);
        self.detect_progress(&attempt_id, incomplete);

        let verification = self.store.read_loop(session_id);
        let reinforcement = self.store.read_reinforcement(session_id);
        let rule = classify(verification.is_some(), reinforcement.is_some(), incomplete);

        let decision = match (rule, verification, reinforcement) {
            (Rule::VerificationLoop, Some(state), _) => {
                self.continue_verification(session_id, &attempt_id, state, transcript_path)
            }
            (Rule::ReinforcementPending, _, Some(state)) => {
                self.reinforce(session_id, &attempt_id, state, incomplete)
            }
            (Rule::ReinforcementFinished, _, _) => {
                self.store.delete_reinforcement(session_id);
                self.store.cleanup_attempt_files(&attempt_id);
                Decision::Allow
            }
            (Rule::PendingWork, _, _) => self.continue_pending_work(&attempt_id, incomplete),
            _ => Decision::Allow,
        };

        log_quiet(
            "decide",
            format!(
                "session={} rule={} incomplete={} outcome={}",
                session_id,
                rule.as_str(),
                incomplete,
                if decision.is_allow() { "allow" } else { "block" }
            ),
            true,
        );

        decision
    }

    /// Reset the attempt budget when the open-todo count moved since the last
    /// call. A missing saved count reads as 0. Returns whether a reset happened.
    pub fn detect_progress(&self, attempt_id: &str, incomplete: u32) -> bool {
        if self.store.todo_count(attempt_id).unwrap_or(0) == incomplete {
            return false;
        }
        self.store.reset_attempts(attempt_id);
        self.store.save_todo_count(attempt_id, incomplete);
        true
    }

    fn continue_verification(
        &self,
        session_id: &str,
        attempt_id: &str,
        mut state: VerificationLoop,
        transcript_path: Option<&Path>,
    ) -> Decision {
        let signals = analyze_transcript(transcript_path);

        if signals.approved || state.ceiling_reached() {
            self.clear_session(session_id, attempt_id);
            return Decision::Allow;
        }

        state.advance(signals.rejection.clone());
        self.store.write_loop(session_id, &state);
        Decision::Block(messages::verification_continuation(&state, &signals))
    }

    fn reinforce(
        &self,
        session_id: &str,
        attempt_id: &str,
        mut state: ReinforcementState,
        incomplete: u32,
    ) -> Decision {
        if self.escape_hatch_open(attempt_id) {
            self.store.cleanup_attempt_files(attempt_id);
            self.store.delete_reinforcement(session_id);
            return Decision::Allow;
        }

        self.store.increment_attempts(attempt_id);
        state.reinforce();
        self.store.write_reinforcement(session_id, &state);
        Decision::Block(messages::reinforcement_continuation(&state, incomplete))
    }

    fn continue_pending_work(&self, attempt_id: &str, incomplete: u32) -> Decision {
        if self.escape_hatch_open(attempt_id) {
            self.store.cleanup_attempt_files(attempt_id);
            return Decision::Allow;
        }

        let attempt = self.store.increment_attempts(attempt_id);
        Decision::Block(messages::pending_work(incomplete, attempt, self.max_attempts))
    }

    fn escape_hatch_open(&self, attempt_id: &str) -> bool {
        self.store.attempt_count(attempt_id) >= self.max_attempts
    }

    /// Drop every mode and counter for the session.
    pub fn clear_session(&self, session_id: &str, attempt_id: &str) {
        self.store.delete_loop(session_id);
        self.store.delete_reinforcement(session_id);
        self.store.cleanup_attempt_files(attempt_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MAX_ATTEMPTS: u32 = 5;
    const SESSION: &str = "sess-1";

    fn engine() -> (TempDir, StopEngine) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("project"));
        (dir, StopEngine::new(store, MAX_ATTEMPTS))
    }

    fn transcript(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("transcript.jsonl");
        fs::write(&path, text).unwrap();
        path
    }

    fn active_loop(iteration: u32, max_iterations: u32) -> VerificationLoop {
        let mut state = VerificationLoop::start("implement the exporter", max_iterations).unwrap();
        state.iteration = iteration;
        state
    }

    // -------------------------------------------------------------------------
    // Rule classification
    // -------------------------------------------------------------------------

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(classify(true, true, 3), Rule::VerificationLoop);
        assert_eq!(classify(true, false, 0), Rule::VerificationLoop);
        assert_eq!(classify(false, true, 3), Rule::ReinforcementPending);
        assert_eq!(classify(false, true, 0), Rule::ReinforcementFinished);
        assert_eq!(classify(false, false, 1), Rule::PendingWork);
        assert_eq!(classify(false, false, 0), Rule::Idle);
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(Rule::VerificationLoop.as_str(), "verification-loop");
        assert_eq!(Rule::Idle.as_str(), "idle");
    }

    #[test]
    fn test_decision_accessors() {
        assert!(Decision::Allow.is_allow());
        assert_eq!(Decision::Allow.message(), None);
        let block = Decision::Block("keep going".to_string());
        assert!(!block.is_allow());
        assert_eq!(block.message(), Some("keep going"));
    }

    // -------------------------------------------------------------------------
    // Verification loop
    // -------------------------------------------------------------------------

    #[test]
    fn test_loop_without_signals_advances_one_iteration() {
        let (_dir, engine) = engine();
        for start in 1..4 {
            engine.store().write_loop(SESSION, &active_loop(start, 5));

            let decision = engine.decide(SESSION, None, 0);

            assert!(!decision.is_allow());
            let state = engine.store().read_loop(SESSION).unwrap();
            assert_eq!(state.iteration, start + 1);
            assert!(state.verifier_feedback.is_empty());
        }
    }

    #[test]
    fn test_loop_at_ceiling_allows_and_clears_both_modes() {
        let (_dir, engine) = engine();
        engine.store().write_loop(SESSION, &active_loop(5, 5));
        engine
            .store()
            .write_reinforcement(SESSION, &ReinforcementState::start("x", true));

        assert_eq!(engine.decide(SESSION, None, 2), Decision::Allow);
        assert!(!engine.store().loop_path(SESSION).exists());
        assert!(!engine.store().reinforcement_path(SESSION).exists());
    }

    #[test]
    fn test_loop_beyond_ceiling_allows() {
        let (_dir, engine) = engine();
        engine.store().write_loop(SESSION, &active_loop(9, 5));
        assert_eq!(engine.decide(SESSION, None, 0), Decision::Allow);
        assert!(engine.store().read_loop(SESSION).is_none());
    }

    #[test]
    fn test_loop_approval_allows_and_clears_everything() {
        let (dir, engine) = engine();
        let path = transcript(&dir, "<oracle-approved>VERIFIED_COMPLETE</oracle-approved>");
        engine.store().write_loop(SESSION, &active_loop(2, 5));
        engine
            .store()
            .write_reinforcement(SESSION, &ReinforcementState::start("x", true));
        let attempt_id = engine.store().attempt_id(SESSION);
        engine.store().increment_attempts(&attempt_id);

        assert_eq!(engine.decide(SESSION, Some(path.as_path()), 0), Decision::Allow);
        assert!(!engine.store().loop_path(SESSION).exists());
        assert!(!engine.store().reinforcement_path(SESSION).exists());
        assert!(!engine.store().attempts_path(&attempt_id).exists());
    }

    #[test]
    fn test_loop_rejection_records_feedback() {
        let (dir, engine) = engine();
        let path = transcript(&dir, "Verification failed\nIssue: missing tests\n");
        engine.store().write_loop(SESSION, &active_loop(4, 5));

        let decision = engine.decide(SESSION, Some(path.as_path()), 0);

        let message = decision.message().unwrap();
        assert!(message.contains("5/5"));
        assert!(message.contains("missing tests"));
        let state = engine.store().read_loop(SESSION).unwrap();
        assert_eq!(state.iteration, 5);
        assert_eq!(state.verifier_feedback, vec!["missing tests".to_string()]);
    }

    #[test]
    fn test_loop_rejection_without_details_appends_empty_feedback() {
        let (dir, engine) = engine();
        let path = transcript(&dir, "the oracle rejected it");
        engine.store().write_loop(SESSION, &active_loop(1, 5));

        engine.decide(SESSION, Some(path.as_path()), 0);

        let state = engine.store().read_loop(SESSION).unwrap();
        assert_eq!(state.verifier_feedback, vec![String::new()]);
    }

    #[test]
    fn test_loop_does_not_touch_attempt_counter() {
        let (_dir, engine) = engine();
        engine.store().write_loop(SESSION, &active_loop(1, 5));
        engine.decide(SESSION, None, 3);

        let attempt_id = engine.store().attempt_id(SESSION);
        assert_eq!(engine.store().attempt_count(&attempt_id), 0);
    }

    // -------------------------------------------------------------------------
    // Reinforcement mode
    // -------------------------------------------------------------------------

    #[test]
    fn test_reinforcement_blocks_with_open_todos() {
        let (_dir, engine) = engine();
        engine
            .store()
            .write_reinforcement(SESSION, &ReinforcementState::start("ship", false));

        let decision = engine.decide(SESSION, None, 2);

        let message = decision.message().unwrap();
        assert!(message.contains("[REINFORCEMENT #1]"));
        assert!(message.contains("2 todos"));
        let state = engine.store().read_reinforcement(SESSION).unwrap();
        assert_eq!(state.reinforcement_count, 1);
        let attempt_id = engine.store().attempt_id(SESSION);
        assert_eq!(engine.store().attempt_count(&attempt_id), 1);
    }

    #[test]
    fn test_reinforcement_escape_hatch() {
        let (_dir, engine) = engine();
        engine
            .store()
            .write_reinforcement(SESSION, &ReinforcementState::start("ship", false));

        for _ in 0..MAX_ATTEMPTS {
            assert!(!engine.decide(SESSION, None, 2).is_allow());
        }
        assert_eq!(engine.decide(SESSION, None, 2), Decision::Allow);
        assert!(engine.store().read_reinforcement(SESSION).is_none());
        let attempt_id = engine.store().attempt_id(SESSION);
        assert!(!engine.store().attempts_path(&attempt_id).exists());
    }

    #[test]
    fn test_reinforcement_finished_allows_and_deletes() {
        let (_dir, engine) = engine();
        let mut state = ReinforcementState::start("ship", false);
        state.reinforcement_count = 2;
        engine.store().write_reinforcement(SESSION, &state);

        assert_eq!(engine.decide(SESSION, None, 0), Decision::Allow);
        assert!(!engine.store().reinforcement_path(SESSION).exists());
    }

    // -------------------------------------------------------------------------
    // Baseline and escape hatch
    // -------------------------------------------------------------------------

    #[test]
    fn test_pending_work_blocks_and_counts() {
        let (_dir, engine) = engine();
        let decision = engine.decide(SESSION, None, 3);

        assert!(decision.message().unwrap().contains('3'));
        let attempt_id = engine.store().attempt_id(SESSION);
        assert_eq!(engine.store().attempt_count(&attempt_id), 1);
    }

    #[test]
    fn test_pending_work_escape_hatch_after_max_attempts() {
        let (_dir, engine) = engine();
        for _ in 0..MAX_ATTEMPTS {
            assert!(!engine.decide(SESSION, None, 3).is_allow());
        }

        assert_eq!(engine.decide(SESSION, None, 3), Decision::Allow);
        let attempt_id = engine.store().attempt_id(SESSION);
        assert!(!engine.store().attempts_path(&attempt_id).exists());
    }

    #[test]
    fn test_progress_resets_attempt_counter() {
        let (_dir, engine) = engine();
        for _ in 0..3 {
            engine.decide(SESSION, None, 4);
        }
        let attempt_id = engine.store().attempt_id(SESSION);
        assert_eq!(engine.store().attempt_count(&attempt_id), 3);

        assert!(engine.detect_progress(&attempt_id, 3));
        assert_eq!(engine.store().attempt_count(&attempt_id), 0);
        assert_eq!(engine.store().todo_count(&attempt_id), Some(3));
        assert!(!engine.detect_progress(&attempt_id, 3));
    }

    #[test]
    fn test_idle_allows_without_writing_state() {
        let (_dir, engine) = engine();
        assert_eq!(engine.decide(SESSION, None, 0), Decision::Allow);
        assert!(!engine.store().state_dir().exists());
    }

    #[test]
    fn test_default_session_shares_budget_per_directory() {
        let (_dir, engine) = engine();
        engine.decide("default", None, 2);
        engine.decide("", None, 2);

        let attempt_id = engine.store().attempt_id("default");
        assert!(attempt_id.starts_with("cwd-"));
        assert_eq!(engine.store().attempt_count(&attempt_id), 2);
    }

    #[test]
    fn test_clear_session_is_idempotent() {
        let (_dir, engine) = engine();
        let attempt_id = engine.store().attempt_id(SESSION);
        engine.clear_session(SESSION, &attempt_id);
        engine.clear_session(SESSION, &attempt_id);
        assert!(engine.store().read_loop(SESSION).is_none());
    }
}
