pub mod types;

use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::error::{AppError, Result};
use crate::paths::AppPaths;
use crate::process::types::SpawnSpec;
use crate::store::types::{Platform, Project, Task};
use types::{
    DEVICE_ENV, INTEGRATION_APP, INTEGRATION_MAX_ROUNDS, INTEGRATION_TASK, INTEGRATION_URL,
    PRIMARY_TASK,
};

/// Run `task` of `project` through the engine.
pub fn task_invocation(
    paths: &AppPaths,
    config: &EngineConfig,
    project: &Project,
    task: &Task,
) -> Result<SpawnSpec> {
    let goal = task
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(&task.name);
    let task_dir = PathBuf::from(&project.workspace_dir)
        .join("tasks")
        .join(&task.id);

    let mut spec = engine_spec(paths, config)?
        .args(["--platform", project.platform.as_str()])
        .args(["--app", project.name.as_str()])
        .args(["--root_dir", project.workspace_dir.as_str()])
        .args(["--task_desc", goal])
        .arg("--task_dir")
        .arg(task_dir.display().to_string());
    spec = target(spec, project, task.url.as_deref());

    if let Some(provider) = task.model_provider.as_deref() {
        let model = if provider == "ollama" { "local" } else { "api" };
        spec = spec
            .args(["--model", model])
            .env("MODEL_PROVIDER", provider);
    }
    if let Some(name) = task.model_name.as_deref() {
        spec = spec.args(["--model_name", name]).env("MODEL_NAME", name);
    }
    Ok(spec)
}

/// Open-ended exploration run for the project's primary slot.
pub fn primary_invocation(
    paths: &AppPaths,
    config: &EngineConfig,
    project: &Project,
) -> Result<SpawnSpec> {
    let spec = engine_spec(paths, config)?
        .args(["--platform", project.platform.as_str()])
        .args(["--app", project.name.as_str()])
        .args(["--root_dir", project.workspace_dir.as_str()])
        .args(["--task_desc", PRIMARY_TASK]);
    Ok(target(spec, project, None))
}

/// The scripted integration scenario, capped at a few rounds.
pub fn integration_invocation(paths: &AppPaths, config: &EngineConfig) -> Result<SpawnSpec> {
    let root = paths.integration_test_dir();
    Ok(engine_spec(paths, config)?
        .args(["--platform", Platform::Web.as_str()])
        .args(["--app", INTEGRATION_APP])
        .args(["--url", INTEGRATION_URL])
        .args(["--task_desc", INTEGRATION_TASK])
        .arg("--root_dir")
        .arg(root.display().to_string())
        .env("MAX_ROUNDS", INTEGRATION_MAX_ROUNDS.to_string()))
}

/// Point the run at the project's page or device. The engine has no
/// device option: adb picks up the serial from the environment, and the
/// engine's own device prompt (asked when several are attached) is
/// answered on stdin.
fn target(mut spec: SpawnSpec, project: &Project, url_override: Option<&str>) -> SpawnSpec {
    match project.platform {
        Platform::Web => {
            if let Some(url) = url_override.or(project.url.as_deref()) {
                spec = spec.args(["--url", url]);
            }
        }
        Platform::Android => {
            if let Some(device) = project.device.as_deref() {
                spec = spec.env(DEVICE_ENV, device).stdin(format!("{}\n", device));
            }
        }
    }
    spec
}

fn engine_spec(paths: &AppPaths, config: &EngineConfig) -> Result<SpawnSpec> {
    let python = paths.venv_python();
    if !python.exists() {
        return Err(AppError::EnvironmentNotReady(format!(
            "python environment missing at {}; run setup first",
            paths.venv_dir().display()
        )));
    }
    let script = paths.explorer_script();
    if !script.is_file() {
        return Err(AppError::EnvironmentNotReady(format!(
            "automation engine missing at {}",
            script.display()
        )));
    }

    // Engine config first so the fixed variables below win.
    Ok(SpawnSpec::new(python)
        .arg("-u")
        .arg(script.display().to_string())
        .cwd(&paths.engine_dir)
        .envs(config.to_env()?)
        .env("PYTHONUNBUFFERED", "1")
        .env("PYTHONIOENCODING", "utf-8"))
}
