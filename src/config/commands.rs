use tauri::State;

use super::EngineConfig;
use crate::ipc::{reply, Reply};
use crate::state::AppState;

#[tauri::command]
pub async fn config_load(state: State<'_, AppState>) -> Reply<EngineConfig> {
    reply(EngineConfig::load(&state.paths.config_file()).await)
}

#[tauri::command]
pub async fn config_save(state: State<'_, AppState>, config: EngineConfig) -> Reply<()> {
    reply(config.save(&state.paths.config_file()).await)
}
