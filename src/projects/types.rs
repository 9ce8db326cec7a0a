use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::store::types::{Platform, ProjectStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectIdRequest {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: String,
    pub platform: Platform,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_target(self.platform, self.url.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

impl UpdateProjectRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        // An empty url clears it; whether that is allowed depends on the platform.
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            validate_url(url)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProjectResponse {
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverStoreResponse {
    /// Where the unreadable file was moved, if it was.
    pub backup_path: Option<String>,
}

/// Names become directory names under the documents root.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid("name must not be empty"));
    }
    if trimmed != name {
        return Err(AppError::invalid("name must not start or end with whitespace"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) || name.contains('\0') {
        return Err(AppError::invalid(format!(
            "name {:?} cannot be used as a folder name",
            name
        )));
    }
    Ok(())
}

pub(crate) fn validate_target(platform: Platform, url: Option<&str>) -> Result<()> {
    match (platform, url) {
        (Platform::Web, None) => Err(AppError::invalid("web projects need a url")),
        (_, Some(url)) => validate_url(url),
        (Platform::Android, None) => Ok(()),
    }
}

pub(crate) fn validate_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|err| AppError::invalid(format!("invalid url {:?}: {}", raw, err)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::invalid(format!(
            "unsupported url scheme {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_are_rejected() {
        let raw = serde_json::json!({"name": "Shop", "platform": "web", "url": "https://a.b", "color": "red"});
        assert!(serde_json::from_value::<CreateProjectRequest>(raw).is_err());
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        let raw = serde_json::json!({"name": "Shop", "platform": "ios"});
        assert!(serde_json::from_value::<CreateProjectRequest>(raw).is_err());
    }

    #[test]
    fn test_web_project_needs_url() {
        let request = CreateProjectRequest {
            name: "Shop".into(),
            platform: Platform::Web,
            device: None,
            url: None,
        };
        assert!(matches!(request.validate(), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("Foo Bar").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url("https://example.com/path").is_ok());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
