use tauri_plugin_opener::OpenerExt;

use super::{OpenUrlRequest, SystemInfo};
use crate::error::AppError;
use crate::ipc::{reply, Reply};

#[tauri::command]
pub async fn system_info() -> Reply<SystemInfo> {
    reply(Ok(super::system_info().await))
}

#[tauri::command]
pub fn open_external_url(app: tauri::AppHandle, req: OpenUrlRequest) -> Reply<()> {
    let result = super::external_url(&req.url).and_then(|url| {
        app.opener()
            .open_url(url.as_str(), None::<&str>)
            .map_err(|err| AppError::CommandFailed {
                program: format!("open {}", url),
                detail: err.to_string(),
            })
    });
    reply(result)
}
