pub mod types;

#[cfg(feature = "desktop")]
pub mod commands;

use crate::agents;
use crate::config::EngineConfig;
use crate::error::{AppError, Result};
use crate::events::types::{TaskComplete, TaskError, TaskOutput};
use crate::events::AppEvent;
use crate::process::types::{OutputStream, ProcessEvent, ProcessKey};
use crate::process::RunningProcess;
use crate::state::AppState;
use crate::store::types::{Task, TaskStatus};
use crate::store::{find_project_mut, find_task_mut, next_id, now_iso};
use types::{
    CreateTaskRequest, StartTaskResponse, StopTaskResponse, TaskRefRequest, UpdateTaskRequest,
};

pub async fn create_task(state: &AppState, req: CreateTaskRequest) -> Result<Task> {
    req.validate()?;
    let task = state
        .store
        .mutate(|store| {
            let project = find_project_mut(store, &req.project_id)?;
            let now = now_iso();
            let task = Task {
                id: next_id(project.tasks.iter().map(|t| t.id.as_str())),
                name: req.name,
                description: non_empty(req.description),
                url: non_empty(req.url),
                model_provider: non_empty(req.model_provider),
                model_name: non_empty(req.model_name),
                status: TaskStatus::Pending,
                output: String::new(),
                error: String::new(),
                last_run_at: None,
                run_id: None,
                created_at: now.clone(),
                updated_at: now,
                extra: Default::default(),
            };
            project.tasks.push(task.clone());
            project.updated_at = task.updated_at.clone();
            Ok(task)
        })
        .await?;
    tracing::info!(project_id = %req.project_id, task_id = %task.id, "task created");
    Ok(task)
}

pub async fn update_task(state: &AppState, req: UpdateTaskRequest) -> Result<Task> {
    req.validate()?;
    state
        .store
        .mutate(|store| {
            let task = find_task_mut(store, &req.project_id, &req.task_id)?;
            if let Some(name) = req.name {
                task.name = name;
            }
            if let Some(description) = req.description {
                task.description = non_empty(Some(description));
            }
            if let Some(url) = req.url {
                task.url = non_empty(Some(url));
            }
            if let Some(provider) = req.model_provider {
                task.model_provider = non_empty(Some(provider));
            }
            if let Some(model) = req.model_name {
                task.model_name = non_empty(Some(model));
            }
            task.updated_at = now_iso();
            Ok(task.clone())
        })
        .await
}

/// Deleting a running task stops it first.
pub async fn delete_task(state: &AppState, req: TaskRefRequest) -> Result<()> {
    let key = ProcessKey::task(&req.project_id, &req.task_id);
    if state.registry.is_running(&key) {
        state.registry.stop(&key).await?;
    }
    state
        .store
        .mutate(|store| {
            let project = find_project_mut(store, &req.project_id)?;
            let before = project.tasks.len();
            project.tasks.retain(|t| t.id != req.task_id);
            if project.tasks.len() == before {
                return Err(AppError::TaskNotFound {
                    project_id: req.project_id.clone(),
                    task_id: req.task_id.clone(),
                });
            }
            project.updated_at = now_iso();
            Ok(())
        })
        .await?;
    tracing::info!(project_id = %req.project_id, task_id = %req.task_id, "task deleted");
    Ok(())
}

/// Spawn the engine for a task and return once it is running. The outcome
/// arrives later as `task:complete`.
pub async fn start_task(state: &AppState, req: TaskRefRequest) -> Result<StartTaskResponse> {
    let TaskRefRequest {
        project_id,
        task_id,
    } = req;
    let key = ProcessKey::task(&project_id, &task_id);
    // A second start of the same task must see the slot taken before it
    // touches the stored run.
    let _starting = state.task_starts.lock().await;

    let snapshot = state.store.load().await?;
    let project = snapshot
        .project(&project_id)
        .ok_or_else(|| AppError::ProjectNotFound(project_id.clone()))?;
    let task = project.task(&task_id).ok_or_else(|| AppError::TaskNotFound {
        project_id: project_id.clone(),
        task_id: task_id.clone(),
    })?;
    if state.registry.is_running(&key) {
        return Err(AppError::AlreadyRunning(key.to_string()));
    }

    let config = EngineConfig::load(&state.paths.config_file()).await?;
    let spec = agents::task_invocation(&state.paths, &config, project, task)?;
    tokio::fs::create_dir_all(&project.workspace_dir).await?;

    let run_id = state.store.begin_run(&project_id, &task_id).await?;
    let running = match state.registry.spawn(key, spec) {
        Ok(running) => running,
        Err(err) => {
            let message = err.to_string();
            state.events.emit(AppEvent::TaskError(TaskError {
                project_id: project_id.clone(),
                task_id: task_id.clone(),
                error: message.clone(),
            }));
            if let Err(store_err) = state
                .store
                .finish_run(&project_id, &task_id, &run_id, TaskStatus::Failed, Some(&message))
                .await
            {
                tracing::warn!(task_id = %task_id, error = %store_err, "failed to record spawn failure");
            }
            return Err(err);
        }
    };

    let pid = running.pid;
    tracing::info!(project_id = %project_id, task_id = %task_id, pid = ?pid, "task started");
    tokio::spawn(drive_run(state.clone(), project_id, task_id, run_id, running));
    Ok(StartTaskResponse { pid })
}

/// Stop a running task and wait for it to exit. Without a live process
/// this is `NotRunning` and the stored status is left alone.
pub async fn stop_task(state: &AppState, req: TaskRefRequest) -> Result<StopTaskResponse> {
    let key = ProcessKey::task(&req.project_id, &req.task_id);
    let run_id = state
        .store
        .load()
        .await?
        .project(&req.project_id)
        .and_then(|project| project.task(&req.task_id))
        .and_then(|task| task.run_id.clone())
        .unwrap_or_default();

    let outcome = state.registry.stop(&key).await?;
    if !outcome.cancelled {
        // Exited on its own first; the run driver records that outcome.
        return Ok(StopTaskResponse {
            status: TaskStatus::from_exit_code(outcome.code),
        });
    }
    let task = state
        .store
        .finish_run(&req.project_id, &req.task_id, &run_id, TaskStatus::Cancelled, None)
        .await?;
    tracing::info!(project_id = %req.project_id, task_id = %req.task_id, "task cancelled");
    Ok(StopTaskResponse {
        status: task.status,
    })
}

/// Forwards output to the renderer and the store, in arrival order, then
/// records the exit. Whatever output is queued is persisted in one write.
async fn drive_run(
    state: AppState,
    project_id: String,
    task_id: String,
    run_id: String,
    running: RunningProcess,
) {
    let mut events = running.events;
    let mut batch = Vec::new();
    while let Some(first) = events.recv().await {
        let mut exited = None;
        let mut next = Some(first);
        while let Some(event) = next.take() {
            match event {
                ProcessEvent::Output { stream, line } => {
                    let event = match stream {
                        OutputStream::Stdout => AppEvent::TaskOutput(TaskOutput {
                            project_id: project_id.clone(),
                            task_id: task_id.clone(),
                            output: line.clone(),
                        }),
                        OutputStream::Stderr => AppEvent::TaskError(TaskError {
                            project_id: project_id.clone(),
                            task_id: task_id.clone(),
                            error: line.clone(),
                        }),
                    };
                    state.events.emit(event);
                    batch.push((stream, line));
                    next = events.try_recv().ok();
                }
                ProcessEvent::Exited(outcome) => exited = Some(outcome),
            }
        }

        if let Err(err) = state
            .store
            .append_output(&project_id, &task_id, &run_id, &batch)
            .await
        {
            tracing::warn!(task_id = %task_id, error = %err, "failed to persist task output");
        }
        batch.clear();

        if let Some(outcome) = exited {
            let status = if outcome.cancelled {
                TaskStatus::Cancelled
            } else {
                TaskStatus::from_exit_code(outcome.code)
            };
            // A stopped task may be gone already if it was stopped for deletion.
            match state
                .store
                .finish_run(&project_id, &task_id, &run_id, status, None)
                .await
            {
                Ok(_) => {}
                Err(err @ (AppError::TaskNotFound { .. } | AppError::ProjectNotFound(_))) => {
                    tracing::debug!(task_id = %task_id, error = %err, "run outcome not recorded");
                }
                Err(err) => {
                    tracing::warn!(task_id = %task_id, error = %err, "failed to persist task outcome");
                }
            }
            tracing::info!(task_id = %task_id, code = ?outcome.code, ?status, "task finished");
            state.events.emit(AppEvent::TaskComplete(TaskComplete {
                project_id,
                task_id,
                exit_code: outcome.code,
                status,
            }));
            return;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::paths::AppPaths;
    use crate::process::ProcessRegistry;
    use crate::projects::{self, types::CreateProjectRequest};
    use crate::store::types::Platform;
    use crate::testing::{fake_engine, wait_for};

    async fn fixture(python_body: &str) -> (tempfile::TempDir, AppState, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::rooted(dir.path());
        fake_engine(&paths, python_body);
        let state = AppState::with_registry(paths, ProcessRegistry::with_grace(Duration::from_millis(500)));

        let project = projects::create_project(
            &state,
            CreateProjectRequest {
                name: "Shop".into(),
                platform: Platform::Web,
                device: None,
                url: Some("https://shop.example".into()),
            },
        )
        .await
        .unwrap();
        let task = create_task(&state, create_request(&project.id, "Checkout"))
            .await
            .unwrap();
        (dir, state, project.id, task.id)
    }

    fn create_request(project_id: &str, name: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            project_id: project_id.into(),
            name: name.into(),
            description: Some("buy something".into()),
            url: None,
            model_provider: None,
            model_name: None,
        }
    }

    fn task_ref(project_id: &str, task_id: &str) -> TaskRefRequest {
        TaskRefRequest {
            project_id: project_id.into(),
            task_id: task_id.into(),
        }
    }

    async fn stored_task(state: &AppState, project_id: &str, task_id: &str) -> Task {
        projects::get_project(state, project_id)
            .await
            .unwrap()
            .task(task_id)
            .cloned()
            .unwrap()
    }

    fn completion_of(task_id: &str) -> impl FnMut(&AppEvent) -> Option<TaskComplete> + '_ {
        move |event| match event {
            AppEvent::TaskComplete(done) if done.task_id == task_id => Some(done.clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_successful_run_completes_with_output() {
        let (_dir, state, project_id, task_id) =
            fixture("echo 'step 1'; echo 'careful' >&2; echo 'final line'; exit 0").await;
        let mut rx = state.events.subscribe();

        start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        let (done, seen) = wait_for(&mut rx, completion_of(&task_id)).await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.exit_code, Some(0));
        let lines: Vec<_> = seen
            .iter()
            .filter_map(|event| match event {
                AppEvent::TaskOutput(out) => Some(out.output.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["step 1", "final line"]);

        let task = stored_task(&state, &project_id, &task_id).await;
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.output.ends_with("final line\n"));
        assert_eq!(task.error, "careful\n");
        assert!(task.last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_failing_run_is_failed_and_released() {
        let (_dir, state, project_id, task_id) = fixture("echo 'boom' >&2; exit 2").await;
        let mut rx = state.events.subscribe();

        start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        let (done, _) = wait_for(&mut rx, completion_of(&task_id)).await;

        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.exit_code, Some(2));
        assert!(!state
            .registry
            .is_running(&ProcessKey::task(&project_id, &task_id)));
        assert_eq!(
            stored_task(&state, &project_id, &task_id).await.status,
            TaskStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_rerun_resets_logs() {
        let (_dir, state, project_id, task_id) = fixture("echo \"run at $$\"").await;
        let mut rx = state.events.subscribe();

        for _ in 0..2 {
            start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
            wait_for(&mut rx, completion_of(&task_id)).await;
        }

        let task = stored_task(&state, &project_id, &task_id).await;
        assert_eq!(task.output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_stop_without_process_leaves_status() {
        let (_dir, state, project_id, task_id) = fixture("exit 0").await;

        let result = stop_task(&state, task_ref(&project_id, &task_id)).await;
        assert!(matches!(result, Err(AppError::NotRunning(_))));
        assert_eq!(
            stored_task(&state, &project_id, &task_id).await.status,
            TaskStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_stop_cancels_running_task() {
        let (_dir, state, project_id, task_id) = fixture("echo started; exec sleep 30").await;
        let mut rx = state.events.subscribe();

        start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        wait_for(&mut rx, |event| match event {
            AppEvent::TaskOutput(out) if out.output == "started" => Some(()),
            _ => None,
        })
        .await;

        let stopped = stop_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        assert_eq!(stopped.status, TaskStatus::Cancelled);
        assert!(!state
            .registry
            .is_running(&ProcessKey::task(&project_id, &task_id)));
        assert_eq!(
            stored_task(&state, &project_id, &task_id).await.status,
            TaskStatus::Cancelled
        );

        let (done, _) = wait_for(&mut rx, completion_of(&task_id)).await;
        assert_eq!(done.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let (_dir, state, project_id, task_id) = fixture("exec sleep 30").await;

        start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        let second = start_task(&state, task_ref(&project_id, &task_id)).await;
        assert!(matches!(second, Err(AppError::AlreadyRunning(_))));
        assert_eq!(
            stored_task(&state, &project_id, &task_id).await.status,
            TaskStatus::Running
        );

        stop_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_starts_leave_the_live_run_alone() {
        let (_dir, state, project_id, task_id) = fixture("echo started; exec sleep 30").await;

        let (a, b) = tokio::join!(
            start_task(&state, task_ref(&project_id, &task_id)),
            start_task(&state, task_ref(&project_id, &task_id)),
        );
        assert!(a.is_ok() != b.is_ok());
        let rejected = if a.is_err() { a } else { b };
        assert!(matches!(rejected, Err(AppError::AlreadyRunning(_))));

        let task = stored_task(&state, &project_id, &task_id).await;
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.error.is_empty());
        assert!(state
            .registry
            .is_running(&ProcessKey::task(&project_id, &task_id)));

        stop_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_after_stop_is_not_touched_by_the_old_run() {
        let (_dir, state, project_id, task_id) = fixture(
            "i=0; while [ $i -lt 400 ]; do echo \"$$ line$i\"; i=$((i+1)); done; exec sleep 30",
        )
        .await;
        let mut rx = state.events.subscribe();

        let first = start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        wait_for(&mut rx, |event| match event {
            AppEvent::TaskOutput(out) if out.output.ends_with(" line0") => Some(()),
            _ => None,
        })
        .await;
        stop_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        let second = start_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        assert_ne!(first.pid, second.pid);

        // Only the first run completes; the second is asleep.
        let (done, _) = wait_for(&mut rx, completion_of(&task_id)).await;
        assert_eq!(done.status, TaskStatus::Cancelled);

        let prefix = format!("{} ", second.pid.unwrap());
        let mut task = stored_task(&state, &project_id, &task_id).await;
        for _ in 0..200 {
            if task.output.lines().count() >= 400 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            task = stored_task(&state, &project_id, &task_id).await;
        }
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.output.lines().count(), 400);
        assert!(task.output.lines().all(|line| line.starts_with(&prefix)));

        stop_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure_marks_failed() {
        let (_dir, state, project_id, task_id) = fixture("exit 0").await;
        // Present but not executable.
        {
            use std::os::unix::fs::PermissionsExt;
            let python = state.paths.venv_python();
            std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o644)).unwrap();
        }

        let result = start_task(&state, task_ref(&project_id, &task_id)).await;
        assert!(matches!(result, Err(AppError::Spawn { .. })));

        let task = stored_task(&state, &project_id, &task_id).await;
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(!task.error.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_task_cannot_start() {
        let (_dir, state, project_id, _task_id) = fixture("exit 0").await;
        let result = start_task(&state, task_ref(&project_id, "missing")).await;
        assert!(matches!(result, Err(AppError::TaskNotFound { .. })));
    }

    #[tokio::test]
    async fn test_rapid_creates_get_distinct_ids() {
        let (_dir, state, project_id, first_id) = fixture("exit 0").await;

        let (a, b) = tokio::join!(
            create_task(&state, create_request(&project_id, "A")),
            create_task(&state, create_request(&project_id, "B")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id, b.id);

        let project = projects::get_project(&state, &project_id).await.unwrap();
        let ids: Vec<_> = project.tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], first_id);
        assert!(ids.contains(&a.id) && ids.contains(&b.id));
    }

    #[tokio::test]
    async fn test_update_and_delete_task() {
        let (_dir, state, project_id, task_id) = fixture("exit 0").await;

        let updated = update_task(
            &state,
            UpdateTaskRequest {
                project_id: project_id.clone(),
                task_id: task_id.clone(),
                name: Some("Renamed".into()),
                description: Some(String::new()),
                url: None,
                model_provider: Some("ollama".into()),
                model_name: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, None);
        assert_eq!(updated.model_provider.as_deref(), Some("ollama"));

        delete_task(&state, task_ref(&project_id, &task_id)).await.unwrap();
        let project = projects::get_project(&state, &project_id).await.unwrap();
        assert!(project.tasks.is_empty());
        assert!(matches!(
            delete_task(&state, task_ref(&project_id, &task_id)).await,
            Err(AppError::TaskNotFound { .. })
        ));
    }
}
