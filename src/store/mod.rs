//! Project/task store backed by a single JSON file.
//!
//! Every mutation is `load -> mutate -> save` under one async mutex, so
//! concurrent writers (output appends racing a rename, say) queue up
//! instead of overwriting each other. Nothing is cached between calls.

pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::process::types::OutputStream;
use crate::utils::fs::write_atomic;
use types::{Project, StoreFile, Task, TaskStatus};

#[derive(Clone)]
pub struct ProjectStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// A missing (or empty) file is a first run, not an error.
    pub async fn load(&self) -> Result<StoreFile> {
        let bytes = match tokio::fs::read(self.path()).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFile::default())
            }
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreFile::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| {
            tracing::error!(path = %self.path().display(), error = %source, "project store is corrupt");
            AppError::CorruptStore {
                path: self.path().to_path_buf(),
                source,
            }
        })
    }

    pub async fn save(&self, state: &StoreFile) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        self.write(state).await
    }

    /// Run `f` against a freshly loaded snapshot and persist the result.
    /// Nothing is written when `f` fails.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreFile) -> Result<T>,
    {
        let _guard = self.inner.write_lock.lock().await;
        let mut state = self.load().await?;
        let value = f(&mut state)?;
        self.write(&state).await?;
        Ok(value)
    }

    /// Move an unreadable store aside and start over empty. Returns the
    /// backup location, or `None` when the store was already readable.
    pub async fn recover(&self) -> Result<Option<PathBuf>> {
        let _guard = self.inner.write_lock.lock().await;
        match self.load().await {
            Ok(_) => Ok(None),
            Err(AppError::CorruptStore { .. }) => {
                let backup = self.path().with_extension(format!(
                    "json.corrupt-{}",
                    Utc::now().timestamp_millis()
                ));
                tokio::fs::rename(self.path(), &backup).await?;
                tracing::warn!(backup = %backup.display(), "moved corrupt project store aside");
                self.write(&StoreFile::default()).await?;
                Ok(Some(backup))
            }
            Err(err) => Err(err),
        }
    }

    /// Enter `running`: clear the previous run's logs and stamp `lastRunAt`.
    /// Returns the run id that later writes for this run must carry.
    pub async fn begin_run(&self, project_id: &str, task_id: &str) -> Result<String> {
        self.mutate(|state| {
            let task = find_task_mut(state, project_id, task_id)?;
            let now = now_iso();
            let run_id = Uuid::new_v4().to_string();
            task.status = TaskStatus::Running;
            task.output.clear();
            task.error.clear();
            task.last_run_at = Some(now.clone());
            task.run_id = Some(run_id.clone());
            task.updated_at = now;
            Ok(run_id)
        })
        .await
    }

    /// Append a batch of output lines to the run `run_id`. Lines from a
    /// run that has since been replaced are dropped.
    pub async fn append_output(
        &self,
        project_id: &str,
        task_id: &str,
        run_id: &str,
        lines: &[(OutputStream, String)],
    ) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        self.mutate(|state| {
            let task = find_task_mut(state, project_id, task_id)?;
            if task.run_id.as_deref() != Some(run_id) {
                tracing::debug!(task_id, run_id, "dropping output of a replaced run");
                return Ok(());
            }
            for (stream, line) in lines {
                let log = match stream {
                    OutputStream::Stdout => &mut task.output,
                    OutputStream::Stderr => &mut task.error,
                };
                log.push_str(line);
                log.push('\n');
            }
            Ok(())
        })
        .await
    }

    /// Record how run `run_id` ended. `detail` goes to the error log, for
    /// failures that never produced process output. A replaced run leaves
    /// the task untouched; the current record is returned either way.
    pub async fn finish_run(
        &self,
        project_id: &str,
        task_id: &str,
        run_id: &str,
        status: TaskStatus,
        detail: Option<&str>,
    ) -> Result<Task> {
        self.mutate(|state| {
            let task = find_task_mut(state, project_id, task_id)?;
            if task.run_id.as_deref() != Some(run_id) {
                tracing::debug!(task_id, run_id, ?status, "ignoring outcome of a replaced run");
                return Ok(task.clone());
            }
            task.status = status;
            if let Some(detail) = detail {
                task.error.push_str(detail);
                task.error.push('\n');
            }
            task.updated_at = now_iso();
            Ok(task.clone())
        })
        .await
    }

    async fn write(&self, state: &StoreFile) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomic(self.path(), &bytes).await?;
        Ok(())
    }
}

pub fn find_project_mut<'a>(state: &'a mut StoreFile, project_id: &str) -> Result<&'a mut Project> {
    state
        .project_mut(project_id)
        .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))
}

pub fn find_task_mut<'a>(
    state: &'a mut StoreFile,
    project_id: &str,
    task_id: &str,
) -> Result<&'a mut Task> {
    find_project_mut(state, project_id)?
        .task_mut(task_id)
        .ok_or_else(|| AppError::TaskNotFound {
            project_id: project_id.to_string(),
            task_id: task_id.to_string(),
        })
}

/// Millisecond timestamp, bumped past any id already taken in scope.
pub fn next_id<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = existing.into_iter().collect();
    let mut candidate = Utc::now().timestamp_millis();
    while taken.contains(&candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
