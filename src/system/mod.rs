#[cfg(feature = "desktop")]
pub mod commands;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use url::Url;

use crate::error::{AppError, Result};

const EXTERNAL_SCHEMES: &[&str] = &["http", "https", "mailto"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_memory_bytes: Option<u64>,
    pub app_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenUrlRequest {
    pub url: String,
}

pub async fn system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu_count: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        total_memory_bytes: total_memory(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Only web and mail links are handed to the OS opener.
pub fn external_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| AppError::invalid(format!("invalid url {:?}: {}", raw, err)))?;
    if !EXTERNAL_SCHEMES.contains(&url.scheme()) {
        return Err(AppError::invalid(format!(
            "refusing to open {} links",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Installed memory in bytes, when the platform reports it.
fn total_memory() -> Option<u64> {
    let mut system = System::new();
    system.refresh_memory();
    Some(system.total_memory()).filter(|&bytes| bytes > 0)
}
