//! Claude Stop Guard: stop-hook CLI
//!
//! Main entry point for the CLI application.
//! The `stop` hook always prints a decision and exits 0; every other command
//! prints a JSON response and exits 1 on error.

use anyhow::{bail, Context};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use claude_stop_guard::models::{
    CancelData, ClearLogsData, ErrorResponse, LogsData, ReinforcementState, StartedData,
    StatusData, SuccessResponse, VerificationLoop,
};
use claude_stop_guard::{
    clear_logs, count_incomplete_todos, handle_stop, log_quiet, read_logs, Cli, Command,
    GuardConfig, HookInput, HookOutput, StateStore, StopEngine,
};

const APPROVE_FALLBACK: &str = r#"{"decision":"approve"}"#;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let is_hook = matches!(cli.command, Command::Stop);

    let result = run(cli).await;
    if is_hook {
        println!("{}", hook_line(result));
        return;
    }

    match result {
        Ok(json) => print_json(&json),
        Err(e) => {
            print_json(&ErrorResponse::new(format!("{:#}", e)));
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(r#"{{"success":false,"error":"{}"}}"#, e),
    }
}

/// Render the stop hook's result as one compact JSON line. Any failure
/// approves the stop.
fn hook_line(result: anyhow::Result<serde_json::Value>) -> String {
    match result.and_then(|json| Ok(serde_json::to_string(&json)?)) {
        Ok(line) => line,
        Err(e) => {
            log_quiet("stop", format!("hook failed, approving: {:#}", e), false);
            APPROVE_FALLBACK.to_string()
        }
    }
}

async fn stop_hook() -> anyhow::Result<HookOutput> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("failed to read hook payload")?;

    let input: HookInput = if raw.trim().is_empty() {
        HookInput::default()
    } else {
        serde_json::from_str(&raw).context("invalid hook payload")?
    };

    let config = GuardConfig::load().unwrap_or_else(|e| {
        log_quiet("config", format!("using defaults: {}", e), false);
        GuardConfig::default()
    });

    Ok(handle_stop(&input, &config).await?)
}

/// Project root from `PROJECT_PATH`, falling back to the current directory.
fn project_root() -> anyhow::Result<PathBuf> {
    match env::var("PROJECT_PATH") {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => env::current_dir().context("could not determine working directory"),
    }
}

/// Load config and open the state store for the current project
fn open_store() -> anyhow::Result<(GuardConfig, StateStore)> {
    let config = GuardConfig::load()?;
    let store = StateStore::from_config(project_root()?, &config);
    Ok((config, store))
}

/// Run the dispatched command
async fn run(cli: Cli) -> anyhow::Result<serde_json::Value> {
    match cli.command {
        Command::Stop => Ok(serde_json::to_value(stop_hook().await?)?),

        Command::StartLoop {
            prompt,
            max_iterations,
            promise,
            with_reinforcement,
            session,
        } => {
            let (config, store) = open_store()?;
            let max = max_iterations.unwrap_or(config.default_max_iterations);
            let mut state = VerificationLoop::start(prompt.clone(), max)?;
            state.completion_promise = promise;
            store.write_loop(&session, &state);
            if store.read_loop(&session).is_none() {
                bail!("failed to write loop state to {}", store.state_dir().display());
            }

            if with_reinforcement {
                store.write_reinforcement(&session, &ReinforcementState::start(prompt, true));
            }

            log_quiet("start-loop", format!("session={} max={}", session, max), true);
            Ok(serde_json::to_value(SuccessResponse::new(StartedData {
                session_id: session,
                mode: "verification-loop".to_string(),
            }))?)
        }

        Command::StartReinforce { prompt, session } => {
            let (_, store) = open_store()?;
            store.write_reinforcement(&session, &ReinforcementState::start(prompt, false));
            if store.read_reinforcement(&session).is_none() {
                bail!(
                    "failed to write reinforcement state to {}",
                    store.state_dir().display()
                );
            }

            log_quiet("start-reinforce", format!("session={}", session), true);
            Ok(serde_json::to_value(SuccessResponse::new(StartedData {
                session_id: session,
                mode: "reinforcement".to_string(),
            }))?)
        }

        Command::Status { session } => {
            let (config, store) = open_store()?;
            let attempt_id = store.attempt_id(&session);
            let status = StatusData {
                verification_loop: store.read_loop(&session),
                reinforcement: store.read_reinforcement(&session),
                attempts: store.attempt_count(&attempt_id),
                max_attempts: config.max_attempts,
                last_todo_count: store.todo_count(&attempt_id),
                pending_todos: count_incomplete_todos(&config.todos_dir(), &session),
                session_id: session,
                attempt_id,
            };
            Ok(serde_json::to_value(SuccessResponse::new(status))?)
        }

        Command::Cancel { session } => {
            let (config, store) = open_store()?;
            let attempt_id = store.attempt_id(&session);
            let engine = StopEngine::new(store, config.max_attempts);
            engine.clear_session(&session, &attempt_id);

            log_quiet("cancel", format!("session={}", session), true);
            Ok(serde_json::to_value(SuccessResponse::new(CancelData {
                session_id: session,
                cancelled: true,
            }))?)
        }

        Command::Logs { n, operation } => {
            let entries = read_logs(n, operation.as_deref())?;
            let count = entries.len();
            let log_data = LogsData {
                entries: entries
                    .into_iter()
                    .map(|e| claude_stop_guard::models::LogEntry {
                        timestamp: e.timestamp.to_rfc3339(),
                        level: if e.success { "info".to_string() } else { "error".to_string() },
                        operation: e.operation,
                        details: e
                            .details
                            .map(|d| serde_json::json!({"message": d}))
                            .unwrap_or(serde_json::json!({})),
                    })
                    .collect(),
                count,
            };
            Ok(serde_json::to_value(SuccessResponse::new(log_data))?)
        }

        Command::ClearLogs => {
            let cleared = clear_logs()?;
            Ok(serde_json::to_value(SuccessResponse::new(ClearLogsData { cleared }))?)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
