use serde::Serialize;

use crate::store::types::TaskStatus;

/// Every push event the backend sends to the renderer. Serializes to the
/// bare payload; the channel name travels separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AppEvent {
    SetupProgress(SetupProgress),
    OllamaPullProgress(OllamaPullProgress),
    TaskOutput(TaskOutput),
    TaskError(TaskError),
    TaskComplete(TaskComplete),
    ProjectOutput(ProjectOutput),
    ProjectError(ProjectError),
    ProjectExit(ProjectExit),
    IntegrationOutput(IntegrationOutput),
    IntegrationComplete(IntegrationComplete),
}

impl AppEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            Self::SetupProgress(_) => "setup:progress",
            Self::OllamaPullProgress(_) => "ollama:pull-progress",
            Self::TaskOutput(_) => "task:output",
            Self::TaskError(_) => "task:error",
            Self::TaskComplete(_) => "task:complete",
            Self::ProjectOutput(_) => "project:output",
            Self::ProjectError(_) => "project:error",
            Self::ProjectExit(_) => "project:exit",
            Self::IntegrationOutput(_) => "integration:output",
            Self::IntegrationComplete(_) => "integration:complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupProgress {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaPullProgress {
    pub model: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    pub project_id: String,
    pub task_id: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    pub project_id: String,
    pub task_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskComplete {
    pub project_id: String,
    pub task_id: String,
    pub exit_code: Option<i32>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutput {
    pub project_id: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectError {
    pub project_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExit {
    pub project_id: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationOutput {
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationComplete {
    pub success: bool,
}
