pub mod agents;
pub mod config;
pub mod error;
pub mod events;
pub mod integration;
pub mod ipc;
pub mod models;
pub mod ollama;
pub mod paths;
pub mod process;
pub mod projects;
pub mod setup;
pub mod state;
pub mod store;
pub mod system;
pub mod tasks;
pub mod utils;

#[cfg(test)]
mod testing;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::{Emitter, Manager, WindowEvent};

    use crate::paths::AppPaths;
    use crate::state::AppState;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "klever_desktop_lib=info".into()),
        )
        .try_init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting klever desktop");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let resource_dir = app.path().resource_dir().ok();
            let paths = AppPaths::from_env(resource_dir.as_deref());
            tracing::info!(
                data_dir = %paths.data_dir.display(),
                engine_dir = %paths.engine_dir.display(),
                "resolved paths"
            );

            let state = AppState::new(paths);
            let mut events = state.events.subscribe();
            app.manage(state);

            // Bridge the backend event bus to the webview.
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while let Some(event) = events.recv().await {
                    if let Err(err) = handle.emit(event.channel(), &event) {
                        tracing::warn!(channel = event.channel(), error = %err, "emit failed");
                    }
                }
            });
            Ok(())
        })
        .on_window_event(|window, event| {
            if window.label() == "main" && matches!(event, WindowEvent::Destroyed) {
                let state = window.state::<AppState>().inner().clone();
                tauri::async_runtime::block_on(state.registry.stop_all());
            }
        })
        .invoke_handler(tauri::generate_handler![
            setup::commands::setup_check_environment,
            setup::commands::setup_create_venv,
            setup::commands::setup_install_packages,
            setup::commands::setup_install_playwright,
            setup::commands::setup_run,
            setup::commands::setup_install_tool,
            config::commands::config_load,
            config::commands::config_save,
            projects::commands::project_list,
            projects::commands::project_get,
            projects::commands::project_create,
            projects::commands::project_update,
            projects::commands::project_delete,
            projects::commands::project_store_recover,
            projects::commands::project_start,
            projects::commands::project_stop,
            tasks::commands::task_create,
            tasks::commands::task_update,
            tasks::commands::task_delete,
            tasks::commands::task_start,
            tasks::commands::task_stop,
            models::commands::model_test,
            models::commands::model_fetch_list,
            ollama::commands::ollama_list,
            ollama::commands::ollama_pull,
            integration::commands::integration_test_run,
            integration::commands::integration_test_stop,
            system::commands::system_info,
            system::commands::open_external_url,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
