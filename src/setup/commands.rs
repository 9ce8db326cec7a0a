use tauri::State;

use super::types::{EnvironmentStatus, InstallToolRequest};
use crate::ipc::{reply, Reply};
use crate::state::AppState;

#[tauri::command]
pub async fn setup_check_environment(state: State<'_, AppState>) -> Reply<EnvironmentStatus> {
    reply(Ok(super::check_environment(state.inner()).await))
}

#[tauri::command]
pub async fn setup_create_venv(state: State<'_, AppState>) -> Reply<()> {
    reply(super::create_venv(state.inner()).await)
}

#[tauri::command]
pub async fn setup_install_packages(state: State<'_, AppState>) -> Reply<()> {
    reply(super::install_packages(state.inner()).await)
}

#[tauri::command]
pub async fn setup_install_playwright(state: State<'_, AppState>) -> Reply<()> {
    reply(super::install_playwright(state.inner()).await)
}

#[tauri::command]
pub async fn setup_run(state: State<'_, AppState>) -> Reply<()> {
    reply(super::run_setup(state.inner()).await)
}

#[tauri::command]
pub async fn setup_install_tool(state: State<'_, AppState>, req: InstallToolRequest) -> Reply<()> {
    reply(super::install_tool(state.inner(), req.tool).await)
}
