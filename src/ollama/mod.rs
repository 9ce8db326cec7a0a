//! Local model management through the `ollama` CLI.

#[cfg(feature = "desktop")]
pub mod commands;

use std::ffi::OsStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::events::types::OllamaPullProgress;
use crate::events::AppEvent;
use crate::process::types::{ProcessKey, SpawnSpec};
use crate::state::AppState;
use crate::utils::command::capture;

const OLLAMA: &str = "ollama";
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OllamaModel {
    pub name: String,
    pub id: String,
    pub size: String,
    pub modified: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PullModelRequest {
    pub model: String,
}

impl PullModelRequest {
    pub fn validate(&self) -> Result<()> {
        let model = self.model.as_str();
        if model.is_empty() || model.starts_with('-') || model.contains(char::is_whitespace) {
            return Err(AppError::invalid(format!("invalid model name: {:?}", model)));
        }
        Ok(())
    }
}

pub async fn list_models(_state: &AppState) -> Result<Vec<OllamaModel>> {
    list_with(OsStr::new(OLLAMA)).await
}

/// Download `req.model`, streaming progress as `ollama:pull-progress`.
/// Pulls of different models may run side by side.
pub async fn pull_model(state: &AppState, req: PullModelRequest) -> Result<()> {
    req.validate()?;
    pull_with(state, OsStr::new(OLLAMA), &req.model).await
}

async fn list_with(program: &OsStr) -> Result<Vec<OllamaModel>> {
    let stdout = capture(program, &["list"], LIST_TIMEOUT).await?;
    Ok(parse_list(&stdout))
}

async fn pull_with(state: &AppState, program: &OsStr, model: &str) -> Result<()> {
    let spec = SpawnSpec::new(program).args(["pull", model]);
    let running = state
        .registry
        .spawn(ProcessKey::OllamaPull(model.to_string()), spec)?;
    tracing::info!(model, "pulling ollama model");

    let events = state.events.clone();
    let outcome = running
        .drive(|_, line| {
            // Progress bars redraw with carriage returns.
            for message in line.split('\r').map(str::trim).filter(|m| !m.is_empty()) {
                events.emit(AppEvent::OllamaPullProgress(OllamaPullProgress {
                    model: model.to_string(),
                    message: message.to_string(),
                }));
            }
        })
        .await;

    if outcome.success() {
        tracing::info!(model, "ollama pull finished");
        Ok(())
    } else {
        Err(AppError::CommandFailed {
            program: format!("ollama pull {}", model),
            detail: outcome.to_string(),
        })
    }
}

/// Parse the table printed by `ollama list`. Columns are separated by at
/// least two spaces; single spaces occur inside `SIZE` and `MODIFIED`.
fn parse_list(stdout: &str) -> Vec<OllamaModel> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with("NAME"))
        .filter_map(|line| {
            let cols: Vec<&str> = line
                .split("  ")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();
            match cols.as_slice() {
                [name, id, size, modified, ..] => Some(OllamaModel {
                    name: name.to_string(),
                    id: id.to_string(),
                    size: size.to_string(),
                    modified: modified.to_string(),
                }),
                [name, id, size] => Some(OllamaModel {
                    name: name.to_string(),
                    id: id.to_string(),
                    size: size.to_string(),
                    modified: String::new(),
                }),
                _ => None,
            }
        })
        .collect()
}
