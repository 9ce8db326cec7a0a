use std::path::PathBuf;

use serde::{Serialize, Serializer};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("task not found: {task_id} (project {project_id})")]
    TaskNotFound { project_id: String, task_id: String },
    #[error("{0} is already running")]
    AlreadyRunning(String),
    #[error("{0} is not running")]
    NotRunning(String),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("project store at {} is corrupt: {source}", path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("environment not ready: {0}")]
    EnvironmentNotReady(String),
    #[error("{program} failed: {detail}")]
    CommandFailed { program: String, detail: String },
    #[error("{stage} failed: {detail}")]
    SetupFailed { stage: String, detail: String },
    #[error("{0}")]
    Provider(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

// Tauri hands command errors to the webview as their serialized form.
impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_message() {
        let err = AppError::TaskNotFound {
            project_id: "1".into(),
            task_id: "2".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"task not found: 2 (project 1)\"");
    }

    #[test]
    fn test_setup_failure_names_stage() {
        let err = AppError::SetupFailed {
            stage: "Installing Python packages".into(),
            detail: "exit code 1".into(),
        };
        assert_eq!(err.to_string(), "Installing Python packages failed: exit code 1");
    }
}
