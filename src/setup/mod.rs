//! Bring the Python runtime to a state where the engine can run:
//! probe what is installed, and the three-stage setup pipeline.

pub mod types;

#[cfg(feature = "desktop")]
pub mod commands;

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use crate::error::{AppError, Result};
use crate::process::types::{ProcessKey, SpawnSpec};
use crate::state::AppState;
use crate::utils::command::{capture, first_line, run_with_timeout};
use types::{
    BrewTool, EnvironmentStatus, PackageStatus, ToolStatus, VenvStatus, STAGE_PACKAGES,
    STAGE_PLAYWRIGHT, STAGE_VENV,
};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PLAYWRIGHT_BROWSER: &str = "chromium";

pub async fn check_environment(state: &AppState) -> EnvironmentStatus {
    let paths = &state.paths;
    let venv_dir = paths.venv_dir();
    let venv_python = paths.venv_python();
    let venv = VenvStatus {
        exists: venv_dir.is_dir(),
        path: venv_dir.display().to_string(),
        ready: venv_python.exists(),
    };

    let base_python = paths.python_for_venv();
    let requirements = paths.requirements_file();

    let python = probe(base_python.as_os_str(), &["--version"]);
    let ollama = probe(OsStr::new("ollama"), &["--version"]);
    let adb = probe(OsStr::new("adb"), &["version"]);
    let homebrew = probe(OsStr::new("brew"), &["--version"]);
    let (python, ollama, adb, homebrew) = tokio::join!(python, ollama, adb, homebrew);

    let (packages, playwright) = if venv.ready {
        tokio::join!(
            package_status(&venv_python, &requirements),
            probe(venv_python.as_os_str(), &["-m", "playwright", "--version"]),
        )
    } else {
        let reason = "virtual environment not created";
        (
            PackageStatus {
                installed: false,
                missing: Vec::new(),
                error: Some(reason.to_string()),
            },
            ToolStatus::missing(reason),
        )
    };

    EnvironmentStatus {
        python,
        venv,
        packages,
        playwright,
        ollama,
        adb,
        homebrew,
    }
}

/// All three stages, each gated on the previous one.
pub async fn run_setup(state: &AppState) -> Result<()> {
    let _guard = acquire(state)?;
    let result = async {
        create_venv_stage(state).await?;
        install_packages_stage(state).await?;
        install_playwright_stage(state).await
    }
    .await;
    if result.is_ok() {
        state.events.setup_progress("Setup complete");
    }
    reported(state, result)
}

pub async fn create_venv(state: &AppState) -> Result<()> {
    let _guard = acquire(state)?;
    let result = create_venv_stage(state).await;
    reported(state, result)
}

pub async fn install_packages(state: &AppState) -> Result<()> {
    let _guard = acquire(state)?;
    let result = install_packages_stage(state).await;
    reported(state, result)
}

pub async fn install_playwright(state: &AppState) -> Result<()> {
    let _guard = acquire(state)?;
    let result = install_playwright_stage(state).await;
    reported(state, result)
}

pub async fn install_tool(state: &AppState, tool: BrewTool) -> Result<()> {
    let _guard = acquire(state)?;
    let stage = format!("brew install {}", tool.as_str());
    state.events.setup_progress(format!("Installing {}...", tool.as_str()));
    let spec = SpawnSpec::new("brew").args(tool.brew_args().iter().copied());
    let result = run_stage(state, &stage, spec).await;
    if result.is_ok() {
        state
            .events
            .setup_progress(format!("{} installed", tool.as_str()));
    }
    reported(state, result)
}

fn acquire(state: &AppState) -> Result<OwnedMutexGuard<()>> {
    state
        .setup_lock
        .clone()
        .try_lock_owned()
        .map_err(|_| AppError::AlreadyRunning(ProcessKey::Setup.to_string()))
}

/// Failures also go to the progress stream, where the user is looking.
fn reported(state: &AppState, result: Result<()>) -> Result<()> {
    if let Err(err) = &result {
        tracing::error!(error = %err, "setup failed");
        state.events.setup_progress(format!("Error: {}", err));
    }
    result
}

async fn create_venv_stage(state: &AppState) -> Result<()> {
    state.events.setup_progress(format!("{}...", STAGE_VENV));
    let venv = state.paths.venv_dir();
    if tokio::fs::try_exists(&venv).await? {
        tokio::fs::remove_dir_all(&venv).await?;
        state
            .events
            .setup_progress("Removed existing virtual environment");
    }
    tokio::fs::create_dir_all(&state.paths.data_dir).await?;

    let spec = SpawnSpec::new(state.paths.python_for_venv())
        .args(["-m", "venv"])
        .arg(venv.display().to_string());
    run_stage(state, STAGE_VENV, spec).await?;

    if !state.paths.venv_python().exists() {
        return Err(stage_failed(STAGE_VENV, "interpreter missing after creation"));
    }
    Ok(())
}

async fn install_packages_stage(state: &AppState) -> Result<()> {
    state.events.setup_progress(format!("{}...", STAGE_PACKAGES));
    let python = venv_python(state)?;
    let requirements = state.paths.requirements_file();
    if !requirements.exists() {
        return Err(stage_failed(
            STAGE_PACKAGES,
            format!("{} not found", requirements.display()),
        ));
    }

    let upgrade = SpawnSpec::new(&python).args(["-m", "pip", "install", "--upgrade", "pip"]);
    if let Err(err) = run_stage(state, "pip upgrade", upgrade).await {
        tracing::warn!(error = %err, "pip upgrade failed, continuing");
        state
            .events
            .setup_progress(format!("Warning: {}; continuing", err));
    }

    let install = SpawnSpec::new(&python)
        .args(["-m", "pip", "install", "-r"])
        .arg(requirements.display().to_string());
    run_stage(state, STAGE_PACKAGES, install).await
}

async fn install_playwright_stage(state: &AppState) -> Result<()> {
    state.events.setup_progress(format!("{}...", STAGE_PLAYWRIGHT));
    let python = venv_python(state)?;
    let spec =
        SpawnSpec::new(python).args(["-m", "playwright", "install", PLAYWRIGHT_BROWSER]);
    run_stage(state, STAGE_PLAYWRIGHT, spec).await
}

fn venv_python(state: &AppState) -> Result<std::path::PathBuf> {
    let python = state.paths.venv_python();
    if !python.exists() {
        return Err(AppError::EnvironmentNotReady(
            "virtual environment not created".to_string(),
        ));
    }
    Ok(python)
}

/// Run one external command on the setup slot, streaming both outputs as
/// progress text.
async fn run_stage(state: &AppState, stage: &str, spec: SpawnSpec) -> Result<()> {
    tracing::info!(stage, program = %spec.program_name(), "setup stage");
    let running = state
        .registry
        .spawn(ProcessKey::Setup, spec)
        .map_err(|err| match err {
            AppError::Spawn { .. } => stage_failed(stage, err),
            other => other,
        })?;

    let events = state.events.clone();
    let outcome = running.drive(|_, line| events.setup_progress(line)).await;
    if outcome.success() {
        Ok(())
    } else {
        Err(stage_failed(stage, outcome))
    }
}

fn stage_failed(stage: &str, detail: impl ToString) -> AppError {
    AppError::SetupFailed {
        stage: stage.to_string(),
        detail: detail.to_string(),
    }
}

async fn probe(program: &OsStr, args: &[&str]) -> ToolStatus {
    match run_with_timeout(program, args, PROBE_TIMEOUT).await {
        Ok(output) if output.status.success() => ToolStatus {
            installed: true,
            version: first_line(&output.stdout).or_else(|| first_line(&output.stderr)),
            error: None,
        },
        Ok(output) => ToolStatus::missing(
            first_line(&output.stderr).unwrap_or_else(|| format!("exited with {}", output.status)),
        ),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ToolStatus::missing("not found"),
        Err(err) => ToolStatus::missing(err.to_string()),
    }
}

/// Compare `pip freeze` against the requirements manifest.
async fn package_status(python: &Path, requirements: &Path) -> PackageStatus {
    let wanted = match tokio::fs::read_to_string(requirements).await {
        Ok(text) => required_packages(&text),
        Err(err) => {
            return PackageStatus {
                installed: false,
                missing: Vec::new(),
                error: Some(format!("{}: {}", requirements.display(), err)),
            }
        }
    };
    let frozen = match capture(python, &["-m", "pip", "freeze"], PROBE_TIMEOUT).await {
        Ok(out) => out,
        Err(err) => {
            return PackageStatus {
                installed: false,
                missing: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    };

    let have: BTreeSet<String> = frozen.lines().filter_map(requirement_name).collect();
    let missing: Vec<String> = wanted.into_iter().filter(|name| !have.contains(name)).collect();
    PackageStatus {
        installed: missing.is_empty(),
        missing,
        error: None,
    }
}

/// Distinct normalized names from a requirements file, in file order.
fn required_packages(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.lines()
        .filter_map(requirement_name)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Package name of one requirements or `pip freeze` line. Options,
/// comments and blank lines yield `None`.
fn requirement_name(line: &str) -> Option<String> {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() || line.starts_with('-') {
        return None;
    }
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(line.len());
    let name = &line[..end];
    if name.is_empty() {
        None
    } else {
        Some(normalize_name(name))
    }
}

/// PEP 503: lowercase, runs of `-`, `_` and `.` collapse to one `-`.
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}


#[cfg(all(test, unix))]
mod pipeline_tests {
    use std::path::PathBuf;

    use super::*;
    use crate::events::AppEvent;
    use crate::paths::AppPaths;
    use crate::testing::fake_executable;

    /// Interpreter stand-in: `-m venv` copies itself into the venv so the
    /// later stages run the same script.
    fn fake_python(pip_exit: i32, upgrade_exit: i32) -> String {
        format!(
            r#"if [ "$1" = "--version" ]; then echo "Python 3.11.4"; exit 0; fi
case "$1 $2" in
  "-m venv") mkdir -p "$3/bin" && cp "$0" "$3/bin/python" && echo "venv ready" ;;
  "-m pip")
    case "$3" in
      freeze) printf 'Requests==2.31.0\nplaywright==1.40.0\n' ;;
      install)
        if [ "$4" = "-r" ]; then echo "Collecting requests"; exit {pip_exit}; fi
        echo "Requirement already satisfied: pip"; exit {upgrade_exit} ;;
    esac ;;
  "-m playwright")
    if [ "$3" = "--version" ]; then echo "Version 1.40.0"; else echo "Downloading Chromium"; fi ;;
  *) exit 3 ;;
esac"#
        )
    }

    fn fixture(pip_exit: i32, upgrade_exit: i32) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let base: PathBuf = dir.path().join("base").join("python");
        fake_executable(&base, &fake_python(pip_exit, upgrade_exit));

        let mut paths = AppPaths::rooted(dir.path());
        paths.base_python = Some(base);
        std::fs::create_dir_all(&paths.engine_dir).unwrap();
        std::fs::write(paths.requirements_file(), "requests>=2\nPyYAML==6.0\nplaywright\n").unwrap();
        (dir, AppState::new(paths))
    }

    fn progress(rx: &mut crate::events::Subscription) -> Vec<String> {
        let mut messages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::SetupProgress(p) = event {
                messages.push(p.message);
            }
        }
        messages
    }

    fn position(messages: &[String], wanted: &str) -> Option<usize> {
        messages.iter().position(|m| m == wanted)
    }

    #[tokio::test]
    async fn test_pipeline_runs_stages_in_order() {
        let (_dir, state) = fixture(0, 0);
        let mut rx = state.events.subscribe();

        run_setup(&state).await.unwrap();

        let messages = progress(&mut rx);
        let venv = position(&messages, "Creating virtual environment...").unwrap();
        let packages = position(&messages, "Installing Python packages...").unwrap();
        let browsers = position(&messages, "Installing Playwright browsers...").unwrap();
        assert!(venv < packages && packages < browsers);
        assert!(messages.contains(&"Downloading Chromium".to_string()));
        assert_eq!(messages.last().map(String::as_str), Some("Setup complete"));
        assert!(state.paths.venv_python().exists());
        assert!(!state.registry.is_running(&ProcessKey::Setup));
    }

    #[tokio::test]
    async fn test_package_failure_stops_pipeline() {
        let (_dir, state) = fixture(1, 0);
        let mut rx = state.events.subscribe();

        let err = run_setup(&state).await.unwrap_err();
        assert!(matches!(
            &err,
            AppError::SetupFailed { stage, .. } if stage == STAGE_PACKAGES
        ));

        let messages = progress(&mut rx);
        assert!(position(&messages, "Installing Python packages...").is_some());
        assert!(position(&messages, "Installing Playwright browsers...").is_none());
        assert!(messages.iter().any(|m| m.starts_with("Error: ")));
    }

    #[tokio::test]
    async fn test_pip_upgrade_failure_is_not_fatal() {
        let (_dir, state) = fixture(0, 1);
        run_setup(&state).await.unwrap();
    }

    #[tokio::test]
    async fn test_rerun_recreates_venv() {
        let (_dir, state) = fixture(0, 0);
        create_venv(&state).await.unwrap();
        let marker = state.paths.venv_dir().join("stale");
        std::fs::write(&marker, "x").unwrap();

        create_venv(&state).await.unwrap();
        assert!(!marker.exists());
        assert!(state.paths.venv_python().exists());
    }

    #[tokio::test]
    async fn test_stages_need_venv() {
        let (_dir, state) = fixture(0, 0);
        assert!(matches!(
            install_playwright(&state).await,
            Err(AppError::EnvironmentNotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_setups_do_not_overlap() {
        let (_dir, state) = fixture(0, 0);
        let _held = state.setup_lock.lock().await;
        assert!(matches!(
            run_setup(&state).await,
            Err(AppError::AlreadyRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_environment_report() {
        let (_dir, state) = fixture(0, 0);

        let before = check_environment(&state).await;
        assert!(before.python.installed);
        assert_eq!(before.python.version.as_deref(), Some("Python 3.11.4"));
        assert!(!before.venv.ready);
        assert!(!before.packages.installed);

        create_venv(&state).await.unwrap();
        let after = check_environment(&state).await;
        assert!(after.venv.exists && after.venv.ready);
        assert_eq!(after.packages.missing, vec!["pyyaml"]);
        assert!(!after.packages.installed);
        assert_eq!(after.playwright.version.as_deref(), Some("Version 1.40.0"));
    }
}
