use tauri::State;

use super::types::{
    CreateProjectRequest, ProjectIdRequest, RecoverStoreResponse, StartProjectResponse,
    UpdateProjectRequest,
};
use crate::ipc::{reply, Reply};
use crate::state::AppState;
use crate::store::types::Project;

#[tauri::command]
pub async fn project_list(state: State<'_, AppState>) -> Reply<Vec<Project>> {
    reply(super::list_projects(state.inner()).await)
}

#[tauri::command]
pub async fn project_get(state: State<'_, AppState>, req: ProjectIdRequest) -> Reply<Project> {
    reply(super::get_project(state.inner(), &req.project_id).await)
}

#[tauri::command]
pub async fn project_create(
    state: State<'_, AppState>,
    req: CreateProjectRequest,
) -> Reply<Project> {
    reply(super::create_project(state.inner(), req).await)
}

#[tauri::command]
pub async fn project_update(
    state: State<'_, AppState>,
    req: UpdateProjectRequest,
) -> Reply<Project> {
    reply(super::update_project(state.inner(), req).await)
}

#[tauri::command]
pub async fn project_delete(state: State<'_, AppState>, req: ProjectIdRequest) -> Reply<()> {
    reply(super::delete_project(state.inner(), &req.project_id).await)
}

#[tauri::command]
pub async fn project_store_recover(state: State<'_, AppState>) -> Reply<RecoverStoreResponse> {
    reply(super::recover_store(state.inner()).await)
}

#[tauri::command]
pub async fn project_start(
    state: State<'_, AppState>,
    req: ProjectIdRequest,
) -> Reply<StartProjectResponse> {
    reply(super::start_project(state.inner(), &req.project_id).await)
}

#[tauri::command]
pub async fn project_stop(state: State<'_, AppState>) -> Reply<()> {
    reply(super::stop_project(state.inner()).await)
}
