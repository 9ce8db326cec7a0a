use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Registry slot. Tasks get one slot each; the rest are singletons
/// (one pull per model name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessKey {
    Task { project_id: String, task_id: String },
    Primary,
    IntegrationTest,
    Setup,
    OllamaPull(String),
}

impl ProcessKey {
    pub fn task(project_id: &str, task_id: &str) -> Self {
        Self::Task {
            project_id: project_id.to_string(),
            task_id: task_id.to_string(),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task { task_id, .. } => write!(f, "task {}", task_id),
            Self::Primary => write!(f, "project run"),
            Self::IntegrationTest => write!(f, "integration test"),
            Self::Setup => write!(f, "environment setup"),
            Self::OllamaPull(model) => write!(f, "ollama pull {}", model),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpawnSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Written to the child's stdin, which is then closed. Without it
    /// stdin is null.
    pub stdin: Option<String>,
}

impl SpawnSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process died from a signal.
    pub code: Option<i32>,
    /// Ended because `stop` was called on it.
    pub cancelled: bool,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        !self.cancelled && self.code == Some(0)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.cancelled, self.code) {
            (true, _) => write!(f, "cancelled"),
            (false, Some(code)) => write!(f, "exited with code {}", code),
            (false, None) => write!(f, "terminated by signal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Output { stream: OutputStream, line: String },
    Exited(ExitOutcome),
}
