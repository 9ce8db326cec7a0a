use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::error::{AppError, Result};

/// Run a short-lived command to completion and return its stdout. Anything
/// other than exit 0 within `limit` is an error.
pub async fn capture<S: AsRef<OsStr>>(program: S, args: &[&str], limit: Duration) -> Result<String> {
    let program = program.as_ref();
    let name = program.to_string_lossy().into_owned();
    let output = run_with_timeout(program, args, limit)
        .await
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::TimedOut => AppError::CommandFailed {
                program: name.clone(),
                detail: source.to_string(),
            },
            _ => AppError::Spawn {
                program: name.clone(),
                source,
            },
        })?;

    if !output.status.success() {
        let detail = first_line(&output.stderr)
            .unwrap_or_else(|| format!("exited with {}", output.status));
        return Err(AppError::CommandFailed {
            program: name,
            detail,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub async fn run_with_timeout(
    program: &OsStr,
    args: &[&str],
    limit: Duration,
) -> std::io::Result<Output> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);
    match tokio::time::timeout(limit, command.output()).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("timed out after {}s", limit.as_secs()),
        )),
    }
}

/// First non-blank line of some process output.
pub fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::fake_executable;

    #[tokio::test]
    async fn test_capture_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool");
        fake_executable(&tool, "echo \"args: $*\"");

        let out = capture(&tool, &["a", "b"], Duration::from_secs(5)).await.unwrap();
        assert_eq!(out, "args: a b\n");
    }

    #[tokio::test]
    async fn test_capture_failures() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool");
        fake_executable(&tool, "echo 'no such model' >&2; exit 1");
        let err = capture(&tool, &[], Duration::from_secs(5)).await.unwrap_err();
        assert!(err.to_string().ends_with("failed: no such model"));

        let slow = dir.path().join("slow");
        fake_executable(&slow, "exec sleep 5");
        let err = capture(&slow, &[], Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, AppError::CommandFailed { .. }));

        let missing = capture(dir.path().join("absent"), &[], Duration::from_secs(1)).await;
        assert!(matches!(missing, Err(AppError::Spawn { .. })));
    }

    #[test]
    fn test_first_line_skips_blanks() {
        assert_eq!(first_line(b"\n  \nPython 3.11.4\n"), Some("Python 3.11.4".into()));
        assert_eq!(first_line(b""), None);
    }
}
