use tauri::State;

use super::{OllamaModel, PullModelRequest};
use crate::ipc::{reply, Reply};
use crate::state::AppState;

#[tauri::command]
pub async fn ollama_list(state: State<'_, AppState>) -> Reply<Vec<OllamaModel>> {
    reply(super::list_models(state.inner()).await)
}

#[tauri::command]
pub async fn ollama_pull(state: State<'_, AppState>, req: PullModelRequest) -> Reply<()> {
    reply(super::pull_model(state.inner(), req).await)
}
