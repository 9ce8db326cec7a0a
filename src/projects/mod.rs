pub mod types;

#[cfg(feature = "desktop")]
pub mod commands;

use crate::agents;
use crate::config::EngineConfig;
use crate::error::{AppError, Result};
use crate::events::types::{ProjectError, ProjectExit, ProjectOutput};
use crate::events::AppEvent;
use crate::process::types::{OutputStream, ProcessKey};
use crate::state::AppState;
use crate::store::types::{Project, ProjectStatus};
use crate::store::{find_project_mut, next_id, now_iso};
use types::{
    validate_target, CreateProjectRequest, RecoverStoreResponse, StartProjectResponse,
    UpdateProjectRequest,
};

pub async fn list_projects(state: &AppState) -> Result<Vec<Project>> {
    Ok(state.store.load().await?.projects)
}

pub async fn get_project(state: &AppState, project_id: &str) -> Result<Project> {
    state
        .store
        .load()
        .await?
        .project(project_id)
        .cloned()
        .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))
}

pub async fn create_project(state: &AppState, req: CreateProjectRequest) -> Result<Project> {
    req.validate()?;
    let workspace = state.paths.workspace_for(&req.name);
    tokio::fs::create_dir_all(&workspace).await?;

    let project = state
        .store
        .mutate(|store| {
            let now = now_iso();
            let project = Project {
                id: next_id(store.projects.iter().map(|p| p.id.as_str())),
                name: req.name,
                platform: req.platform,
                device: req.device,
                url: req.url,
                status: ProjectStatus::Active,
                created_at: now.clone(),
                updated_at: now,
                tasks: Vec::new(),
                workspace_dir: workspace.display().to_string(),
                extra: Default::default(),
            };
            store.projects.push(project.clone());
            Ok(project)
        })
        .await?;

    tracing::info!(project_id = %project.id, name = %project.name, "project created");
    Ok(project)
}

/// Applies the fields present in `req`. The workspace directory stays
/// where it was created, even on rename.
pub async fn update_project(state: &AppState, req: UpdateProjectRequest) -> Result<Project> {
    req.validate()?;
    state
        .store
        .mutate(|store| {
            let project = find_project_mut(store, &req.project_id)?;
            if let Some(name) = req.name {
                project.name = name;
            }
            if let Some(platform) = req.platform {
                project.platform = platform;
            }
            if let Some(device) = req.device {
                project.device = Some(device).filter(|d| !d.is_empty());
            }
            if let Some(url) = req.url {
                project.url = Some(url).filter(|u| !u.is_empty());
            }
            if let Some(status) = req.status {
                project.status = status;
            }
            validate_target(project.platform, project.url.as_deref())?;
            project.updated_at = now_iso();
            Ok(project.clone())
        })
        .await
}

/// Removes the project and stops its running tasks and its primary run.
/// The workspace directory is left on disk.
pub async fn delete_project(state: &AppState, project_id: &str) -> Result<()> {
    let project = get_project(state, project_id).await?;
    if state.registry.owner(&ProcessKey::Primary).as_deref() == Some(project_id) {
        match state.registry.stop(&ProcessKey::Primary).await {
            Ok(_) | Err(AppError::NotRunning(_)) => {}
            Err(err) => {
                tracing::warn!(project_id, error = %err, "failed to stop run of deleted project")
            }
        }
    }
    for task in &project.tasks {
        let key = ProcessKey::task(&project.id, &task.id);
        if state.registry.is_running(&key) {
            if let Err(err) = state.registry.stop(&key).await {
                tracing::warn!(task_id = %task.id, error = %err, "failed to stop task of deleted project");
            }
        }
    }

    state
        .store
        .mutate(|store| {
            let before = store.projects.len();
            store.projects.retain(|p| p.id != project_id);
            if store.projects.len() == before {
                return Err(AppError::ProjectNotFound(project_id.to_string()));
            }
            Ok(())
        })
        .await?;
    tracing::info!(project_id, "project deleted");
    Ok(())
}

pub async fn recover_store(state: &AppState) -> Result<RecoverStoreResponse> {
    let backup = state.store.recover().await?;
    Ok(RecoverStoreResponse {
        backup_path: backup.map(|p| p.display().to_string()),
    })
}

/// Start the project's exploration run on the primary slot. Output and
/// exit arrive as `project:*` events.
pub async fn start_project(state: &AppState, project_id: &str) -> Result<StartProjectResponse> {
    let project = get_project(state, project_id).await?;
    let config = EngineConfig::load(&state.paths.config_file()).await?;
    let spec = agents::primary_invocation(&state.paths, &config, &project)?;
    tokio::fs::create_dir_all(&project.workspace_dir).await?;

    let running = state
        .registry
        .spawn_owned(ProcessKey::Primary, Some(project.id.clone()), spec)?;
    let pid = running.pid;
    let events = state.events.clone();
    let project_id = project.id;
    tokio::spawn(async move {
        let outcome = running
            .drive(|stream, line| {
                let event = match stream {
                    OutputStream::Stdout => AppEvent::ProjectOutput(ProjectOutput {
                        project_id: project_id.clone(),
                        output: line,
                    }),
                    OutputStream::Stderr => AppEvent::ProjectError(ProjectError {
                        project_id: project_id.clone(),
                        error: line,
                    }),
                };
                events.emit(event);
            })
            .await;
        events.emit(AppEvent::ProjectExit(ProjectExit {
            project_id,
            exit_code: outcome.code,
        }));
    });

    Ok(StartProjectResponse { pid })
}

pub async fn stop_project(state: &AppState) -> Result<()> {
    state.registry.stop(&ProcessKey::Primary).await?;
    Ok(())
}
