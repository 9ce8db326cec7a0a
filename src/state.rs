use std::sync::Arc;
use std::time::Duration;

use crate::events::EventBus;
use crate::paths::AppPaths;
use crate::process::ProcessRegistry;
use crate::store::ProjectStore;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a command needs, passed explicitly instead of living in
/// globals. Cheap to clone; clones share the same registry and store.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub store: ProjectStore,
    pub registry: ProcessRegistry,
    pub events: EventBus,
    pub http: reqwest::Client,
    /// Held for the whole of a setup pipeline or tool install.
    pub setup_lock: Arc<tokio::sync::Mutex<()>>,
    /// Makes the running check, the run reset and the spawn of a task
    /// start one step.
    pub task_starts: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(paths: AppPaths) -> Self {
        Self::with_registry(paths, ProcessRegistry::new())
    }

    pub fn with_registry(paths: AppPaths, registry: ProcessRegistry) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default http client");
                reqwest::Client::new()
            });
        Self {
            store: ProjectStore::new(paths.store_file()),
            paths: Arc::new(paths),
            registry,
            events: EventBus::new(),
            http,
            setup_lock: Arc::new(tokio::sync::Mutex::new(())),
            task_starts: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}
