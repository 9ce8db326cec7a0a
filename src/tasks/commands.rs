use tauri::State;

use super::types::{
    CreateTaskRequest, StartTaskResponse, StopTaskResponse, TaskRefRequest, UpdateTaskRequest,
};
use crate::ipc::{reply, Reply};
use crate::state::AppState;
use crate::store::types::Task;

#[tauri::command]
pub async fn task_create(state: State<'_, AppState>, req: CreateTaskRequest) -> Reply<Task> {
    reply(super::create_task(state.inner(), req).await)
}

#[tauri::command]
pub async fn task_update(state: State<'_, AppState>, req: UpdateTaskRequest) -> Reply<Task> {
    reply(super::update_task(state.inner(), req).await)
}

#[tauri::command]
pub async fn task_delete(state: State<'_, AppState>, req: TaskRefRequest) -> Reply<()> {
    reply(super::delete_task(state.inner(), req).await)
}

#[tauri::command]
pub async fn task_start(
    state: State<'_, AppState>,
    req: TaskRefRequest,
) -> Reply<StartTaskResponse> {
    reply(super::start_task(state.inner(), req).await)
}

#[tauri::command]
pub async fn task_stop(state: State<'_, AppState>, req: TaskRefRequest) -> Reply<StopTaskResponse> {
    reply(super::stop_task(state.inner(), req).await)
}
