//! Scripted end-to-end check of the engine against a public site.

#[cfg(feature = "desktop")]
pub mod commands;

use serde::Serialize;

use crate::agents;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::types::{IntegrationComplete, IntegrationOutput};
use crate::events::AppEvent;
use crate::process::types::ProcessKey;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStarted {
    pub pid: Option<u32>,
}

/// Start the scenario. Both output streams arrive as
/// `integration:output`; the verdict as `integration:complete`.
pub async fn run_integration_test(state: &AppState) -> Result<IntegrationStarted> {
    let config = EngineConfig::load(&state.paths.config_file()).await?;
    let spec = agents::integration_invocation(&state.paths, &config)?;
    tokio::fs::create_dir_all(state.paths.integration_test_dir()).await?;

    let running = state.registry.spawn(ProcessKey::IntegrationTest, spec)?;
    let pid = running.pid;
    let events = state.events.clone();
    tokio::spawn(async move {
        let outcome = running
            .drive(|_, line| events.emit(AppEvent::IntegrationOutput(IntegrationOutput { output: line })))
            .await;
        tracing::info!(code = ?outcome.code, cancelled = outcome.cancelled, "integration test finished");
        events.emit(AppEvent::IntegrationComplete(IntegrationComplete {
            success: outcome.success(),
        }));
    });
    Ok(IntegrationStarted { pid })
}

pub async fn stop_integration_test(state: &AppState) -> Result<()> {
    state.registry.stop(&ProcessKey::IntegrationTest).await?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::paths::AppPaths;
    use crate::testing::{fake_engine, wait_for};

    fn state(python: &str) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::rooted(dir.path());
        fake_engine(&paths, python);
        (dir, AppState::new(paths))
    }

    fn completion(event: &AppEvent) -> Option<bool> {
        match event {
            AppEvent::IntegrationComplete(done) => Some(done.success),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_run_streams_both_outputs() {
        let (_dir, state) =
            state("echo \"rounds=$MAX_ROUNDS\"; echo 'warning' >&2; exit 0");
        let mut rx = state.events.subscribe();

        run_integration_test(&state).await.unwrap();
        let (success, seen) = wait_for(&mut rx, completion).await;

        assert!(success);
        let mut lines: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                AppEvent::IntegrationOutput(out) => Some(out.output.clone()),
                _ => None,
            })
            .collect();
        lines.sort();
        assert_eq!(lines, vec!["rounds=2", "warning"]);
        assert!(state.paths.integration_test_dir().is_dir());
    }

    #[tokio::test]
    async fn test_stop_reports_failure() {
        let (_dir, state) = state("exec sleep 30");
        let mut rx = state.events.subscribe();

        run_integration_test(&state).await.unwrap();
        assert!(matches!(
            run_integration_test(&state).await,
            Err(AppError::AlreadyRunning(_))
        ));
        stop_integration_test(&state).await.unwrap();

        let (success, _) = wait_for(&mut rx, completion).await;
        assert!(!success);
        assert!(matches!(
            stop_integration_test(&state).await,
            Err(AppError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_needs_environment() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(AppPaths::rooted(dir.path()));
        assert!(matches!(
            run_integration_test(&state).await,
            Err(AppError::EnvironmentNotReady(_))
        ));
    }
}
