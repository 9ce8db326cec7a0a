//! Helpers shared by the in-crate tests.

use std::path::Path;
use std::time::Duration;

use crate::events::{AppEvent, Subscription};
use crate::paths::AppPaths;

/// Write an executable `/bin/sh` script at `path`.
#[cfg(unix)]
pub fn fake_executable(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A venv interpreter running `python_body`, plus the engine directory
/// and script it is pointed at.
#[cfg(unix)]
pub fn fake_engine(paths: &AppPaths, python_body: &str) {
    fake_executable(&paths.venv_python(), python_body);
    let script = paths.explorer_script();
    std::fs::create_dir_all(script.parent().unwrap()).unwrap();
    std::fs::write(&script, "").unwrap();
}

/// Receive until `pick` returns something, collecting everything seen.
pub async fn wait_for<T, F>(rx: &mut Subscription, mut pick: F) -> (T, Vec<AppEvent>)
where
    F: FnMut(&AppEvent) -> Option<T>,
{
    let mut seen = Vec::new();
    let found = tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            let event = rx.recv().await.expect("event bus closed");
            let picked = pick(&event);
            seen.push(event);
            if let Some(value) = picked {
                return value;
            }
        }
    })
    .await
    .expect("timed out waiting for event");
    (found, seen)
}
