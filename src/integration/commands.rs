use tauri::State;

use super::IntegrationStarted;
use crate::ipc::{reply, Reply};
use crate::state::AppState;

#[tauri::command]
pub async fn integration_test_run(state: State<'_, AppState>) -> Reply<IntegrationStarted> {
    reply(super::run_integration_test(state.inner()).await)
}

#[tauri::command]
pub async fn integration_test_stop(state: State<'_, AppState>) -> Reply<()> {
    reply(super::stop_integration_test(state.inner()).await)
}
