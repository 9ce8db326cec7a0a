//! Every on-disk location the backend touches.

use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "klever-desktop";
const STORE_FILE: &str = "projects.json";
const VENV_DIR: &str = "python-env";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Holds the project store and the virtual environment.
    pub data_dir: PathBuf,
    /// Directory containing the automation engine (`scripts/self_explorer.py`, `config.yaml`, ...).
    pub engine_dir: PathBuf,
    /// Root under which project workspaces are created.
    pub documents_root: PathBuf,
    /// Interpreter used to create the virtual environment, if pinned.
    pub base_python: Option<PathBuf>,
}

impl AppPaths {
    /// Resolve from `KLEVER_*` environment variables, falling back to
    /// platform directories. `resource_dir` is where a bundled engine and
    /// interpreter live, when running as a packaged app.
    pub fn from_env(resource_dir: Option<&Path>) -> Self {
        let data_dir = env_path("KLEVER_DATA_DIR").unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
        });

        let engine_dir = env_path("KLEVER_ENGINE_DIR").unwrap_or_else(|| match resource_dir {
            Some(dir) => dir.join("appagent"),
            None => PathBuf::from("appagent"),
        });

        let documents_root = env_path("KLEVER_DOCUMENTS_DIR").unwrap_or_else(|| {
            dirs::document_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Klever")
        });

        let base_python = env_path("KLEVER_PYTHON").or_else(|| {
            resource_dir
                .map(bundled_python)
                .filter(|candidate| candidate.exists())
        });

        Self {
            data_dir,
            engine_dir,
            documents_root,
            base_python,
        }
    }

    /// Everything below one directory. Used by tests and portable installs.
    pub fn rooted(root: &Path) -> Self {
        Self {
            data_dir: root.join("data"),
            engine_dir: root.join("appagent"),
            documents_root: root.join("Documents"),
            base_python: None,
        }
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.data_dir.join(VENV_DIR)
    }

    pub fn venv_python(&self) -> PathBuf {
        venv_interpreter(&self.venv_dir())
    }

    pub fn config_file(&self) -> PathBuf {
        self.engine_dir.join("config.yaml")
    }

    pub fn requirements_file(&self) -> PathBuf {
        self.engine_dir.join("requirements.txt")
    }

    pub fn explorer_script(&self) -> PathBuf {
        self.engine_dir.join("scripts").join("self_explorer.py")
    }

    pub fn integration_test_dir(&self) -> PathBuf {
        self.data_dir.join("integration-test")
    }

    /// Interpreter that creates the venv: pinned or bundled, else whatever is on `PATH`.
    pub fn python_for_venv(&self) -> PathBuf {
        self.base_python
            .clone()
            .unwrap_or_else(|| PathBuf::from(system_python()))
    }

    pub fn workspace_for(&self, project_name: &str) -> PathBuf {
        self.documents_root.join(project_name)
    }
}

pub fn venv_interpreter(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

fn bundled_python(resource_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        resource_dir.join("python").join("python.exe")
    } else {
        resource_dir.join("python").join("bin").join("python3")
    }
}

fn system_python() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
