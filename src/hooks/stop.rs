//! Stop hook handler.
//!
//! Runs each time Claude tries to end its turn. Resolves the project root and
//! the session's open todo count, asks the decision engine whether to allow the
//! stop, and converts the answer into hook output. A panic inside the engine
//! approves the stop.

use std::path::{Path, PathBuf};

use crate::config::GuardConfig;
use crate::engine::{Decision, StopEngine};
use crate::error::{Result, StopGuardError};
use crate::logging::log_quiet;
use crate::store::StateStore;
use crate::todos::count_incomplete_todos;

use super::debug::debug as debug_log;
use super::{HookInput, HookOutput};

const HOOK_NAME: &str = "stop";

/// Set to skip the guard entirely (nested or scripted sessions)
pub const DISABLE_ENV: &str = "STOP_GUARD_DISABLE";

fn debug(msg: &str) {
    debug_log(HOOK_NAME, msg);
}

/// Handle the stop hook.
///
/// 1. Skip if the guard is disabled for this process
/// 2. Resolve project root (payload cwd, then `PROJECT_PATH`, then process cwd)
/// 3. Count open todos for the session
/// 4. Run the decision engine on a blocking thread
/// 5. Approve if the engine panicked
pub async fn handle_stop(input: &HookInput, config: &GuardConfig) -> Result<HookOutput> {
    debug("=== Stop hook started ===");

    if std::env::var_os(DISABLE_ENV).is_some() {
        debug("Skipping - guard disabled");
        return Ok(HookOutput::approve());
    }

    let root = resolve_project_root(input)?;
    let session_id = input.session_id().to_string();
    let transcript = input.transcript_path.as_deref().map(expand_home);
    debug(&format!(
        "Session: {}, root: {}, transcript: {:?}, stop_hook_active: {:?}",
        session_id,
        root.display(),
        transcript,
        input.stop_hook_active
    ));

    let config = config.clone();
    let joined = tokio::task::spawn_blocking(move || {
        run_engine(&root, &session_id, transcript.as_deref(), &config)
    })
    .await;

    match joined {
        Ok(decision) => {
            debug(&format!("Decision: allow={}", decision.is_allow()));
            Ok(decision.into())
        }
        Err(e) => {
            debug(&format!("Engine failed: {}", e));
            log_quiet("stop", format!("engine failed, approving: {}", e), false);
            Ok(HookOutput::approve())
        }
    }
}

fn run_engine(
    root: &Path,
    session_id: &str,
    transcript: Option<&Path>,
    config: &GuardConfig,
) -> Decision {
    let incomplete = count_incomplete_todos(&config.todos_dir(), session_id);
    debug(&format!("Incomplete todos: {}", incomplete));

    let store = StateStore::from_config(root, config);
    StopEngine::new(store, config.max_attempts).decide(session_id, transcript, incomplete)
}

fn resolve_project_root(input: &HookInput) -> Result<PathBuf> {
    if let Some(cwd) = input.cwd.as_deref().filter(|c| !c.is_empty()) {
        return Ok(expand_home(cwd));
    }
    if let Ok(path) = std::env::var("PROJECT_PATH") {
        if !path.is_empty() {
            return Ok(expand_home(&path));
        }
    }
    std::env::current_dir().map_err(|e| {
        StopGuardError::State(format!("could not determine working directory: {}", e))
    })
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
