//! Keyed supervision of child processes.
//!
//! Each live process owns one registry slot. A supervisor task waits on
//! the child, forwards its output line by line, and frees the slot when
//! the child is gone. `stop` returns only after that has happened.

pub mod types;

use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{AppError, Result};
use types::{ExitOutcome, OutputStream, ProcessEvent, ProcessKey, SpawnSpec};

const STOP_GRACE: Duration = Duration::from_secs(5);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct ProcessRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    entries: Mutex<HashMap<ProcessKey, ProcessEntry>>,
    grace: Duration,
}

struct ProcessEntry {
    pid: Option<u32>,
    owner: Option<String>,
    cancel: Option<oneshot::Sender<()>>,
    exited: watch::Receiver<Option<ExitOutcome>>,
}

/// Handle returned by [`ProcessRegistry::spawn`]. Events end with exactly
/// one [`ProcessEvent::Exited`].
pub struct RunningProcess {
    pub pid: Option<u32>,
    pub events: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl RunningProcess {
    /// Feed every output line to `on_output` and return how the process ended.
    pub async fn drive<F>(mut self, mut on_output: F) -> ExitOutcome
    where
        F: FnMut(OutputStream, String),
    {
        while let Some(event) = self.events.recv().await {
            match event {
                ProcessEvent::Output { stream, line } => on_output(stream, line),
                ProcessEvent::Exited(outcome) => return outcome,
            }
        }
        ExitOutcome {
            code: None,
            cancelled: false,
        }
    }
}

enum Wake {
    Exited(std::io::Result<ExitStatus>),
    Cancel,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::with_grace(STOP_GRACE)
    }

    /// `grace` is how long `stop` waits after SIGTERM before killing.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: Mutex::new(HashMap::new()),
                grace,
            }),
        }
    }

    /// Start `spec` under `key`. Fails with `AlreadyRunning` if the slot
    /// is taken; the check and the insert happen under one lock.
    pub fn spawn(&self, key: ProcessKey, spec: SpawnSpec) -> Result<RunningProcess> {
        self.spawn_owned(key, None, spec)
    }

    /// Like [`spawn`](Self::spawn), recording who the slot was taken for.
    /// Singleton slots use this to tell whose run they hold.
    pub fn spawn_owned(
        &self,
        key: ProcessKey,
        owner: Option<String>,
        mut spec: SpawnSpec,
    ) -> Result<RunningProcess> {
        let mut entries = self.inner.entries.lock();
        if entries.contains_key(&key) {
            return Err(AppError::AlreadyRunning(key.to_string()));
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| {
            tracing::warn!(key = %key, program = %spec.program_name(), error = %source, "spawn failed");
            AppError::Spawn {
                program: spec.program_name(),
                source,
            }
        })?;
        let pid = child.id();
        if let (Some(mut stdin), Some(input)) = (child.stdin.take(), spec.stdin.take()) {
            tokio::spawn(async move {
                // Fails when the child exits without reading it.
                if let Err(err) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(error = %err, "child did not take its input");
                }
            });
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (exited_tx, exited_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        entries.insert(
            key.clone(),
            ProcessEntry {
                pid,
                owner,
                cancel: Some(cancel_tx),
                exited: exited_rx,
            },
        );
        drop(entries);

        tracing::info!(key = %key, pid = ?pid, program = %spec.program_name(), "process started");
        tokio::spawn(supervise(
            self.clone(),
            key,
            child,
            cancel_rx,
            exited_tx,
            events_tx,
        ));

        Ok(RunningProcess {
            pid,
            events: events_rx,
        })
    }

    /// Terminate the process under `key` and wait until it is gone.
    /// If it exited on its own in the meantime, that outcome is returned
    /// with `cancelled == false`.
    pub async fn stop(&self, key: &ProcessKey) -> Result<ExitOutcome> {
        let (cancel, mut exited) = {
            let mut entries = self.inner.entries.lock();
            let entry = entries
                .get_mut(key)
                .ok_or_else(|| AppError::NotRunning(key.to_string()))?;
            (entry.cancel.take(), entry.exited.clone())
        };

        if let Some(cancel) = cancel {
            tracing::info!(key = %key, "stopping process");
            let _ = cancel.send(());
        }

        let outcome = exited
            .wait_for(Option::is_some)
            .await
            .map(|seen| *seen)
            .map_err(|_| AppError::NotRunning(key.to_string()))?;
        outcome.ok_or_else(|| AppError::NotRunning(key.to_string()))
    }

    /// Stop everything, e.g. on window close. Failures are logged.
    pub async fn stop_all(&self) {
        for key in self.running() {
            match self.stop(&key).await {
                Ok(outcome) => tracing::info!(key = %key, code = ?outcome.code, "stopped on shutdown"),
                Err(AppError::NotRunning(_)) => {}
                Err(err) => tracing::warn!(key = %key, error = %err, "failed to stop on shutdown"),
            }
        }
    }

    pub fn is_running(&self, key: &ProcessKey) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    pub fn pid(&self, key: &ProcessKey) -> Option<u32> {
        self.inner.entries.lock().get(key).and_then(|entry| entry.pid)
    }

    pub fn owner(&self, key: &ProcessKey) -> Option<String> {
        self.inner
            .entries
            .lock()
            .get(key)
            .and_then(|entry| entry.owner.clone())
    }

    pub fn running(&self) -> Vec<ProcessKey> {
        self.inner.entries.lock().keys().cloned().collect()
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn supervise(
    registry: ProcessRegistry,
    key: ProcessKey,
    mut child: Child,
    mut cancel_rx: oneshot::Receiver<()>,
    exited_tx: watch::Sender<Option<ExitOutcome>>,
    events: mpsc::UnboundedSender<ProcessEvent>,
) {
    let readers = [
        child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, OutputStream::Stdout, events.clone()))),
        child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, OutputStream::Stderr, events.clone()))),
    ];

    let wake = tokio::select! {
        status = child.wait() => Wake::Exited(status),
        Ok(()) = &mut cancel_rx => Wake::Cancel,
    };
    let (status, cancelled) = match wake {
        Wake::Exited(status) => (status, false),
        Wake::Cancel => (terminate(&mut child, registry.inner.grace).await, true),
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "failed to wait for process");
            None
        }
    };

    // Grandchildren can hold the pipes open after the child is gone.
    for mut reader in readers.into_iter().flatten() {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
            tracing::debug!(key = %key, "output still open after exit, detaching");
            reader.abort();
        }
    }

    registry.inner.entries.lock().remove(&key);
    let outcome = ExitOutcome { code, cancelled };
    tracing::info!(key = %key, code = ?code, cancelled, "process exited");
    exited_tx.send_replace(Some(outcome));
    let _ = events.send(ProcessEvent::Exited(outcome));
}

async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let _ = Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => return status,
            Err(_) => tracing::warn!(pid, "process ignored SIGTERM, killing"),
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    child.kill().await?;
    child.wait().await
}

async fn forward_lines<R>(reader: R, stream: OutputStream, events: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string();
                // Keep draining even if nobody listens, or the child blocks on a full pipe.
                let _ = events.send(ProcessEvent::Output { stream, line });
            }
            Err(err) => {
                tracing::debug!(?stream, error = %err, "output stream closed");
                break;
            }
        }
    }
}
