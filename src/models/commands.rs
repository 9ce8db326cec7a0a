use tauri::State;

use super::types::{FetchModelsRequest, ModelTestResponse, TestModelRequest};
use crate::ipc::{reply, Reply};
use crate::state::AppState;

#[tauri::command]
pub async fn model_test(
    state: State<'_, AppState>,
    req: TestModelRequest,
) -> Reply<ModelTestResponse> {
    reply(super::test_model(state.inner(), req).await)
}

#[tauri::command]
pub async fn model_fetch_list(
    state: State<'_, AppState>,
    req: FetchModelsRequest,
) -> Reply<Vec<String>> {
    reply(super::fetch_models(state.inner(), req).await)
}
