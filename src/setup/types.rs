use serde::{Deserialize, Serialize};

pub const STAGE_VENV: &str = "Creating virtual environment";
pub const STAGE_PACKAGES: &str = "Installing Python packages";
pub const STAGE_PLAYWRIGHT: &str = "Installing Playwright browsers";

/// Result of running a tool's version command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStatus {
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolStatus {
    pub fn missing(error: impl Into<String>) -> Self {
        Self {
            installed: false,
            version: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenvStatus {
    pub exists: bool,
    pub path: String,
    /// The interpreter inside the venv is present.
    pub ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStatus {
    pub installed: bool,
    /// Requirement names (normalized) absent from `pip freeze`.
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    pub python: ToolStatus,
    pub venv: VenvStatus,
    pub packages: PackageStatus,
    pub playwright: ToolStatus,
    pub ollama: ToolStatus,
    pub adb: ToolStatus,
    pub homebrew: ToolStatus,
}

/// Auxiliary tools that can be installed through Homebrew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrewTool {
    Ollama,
    AndroidPlatformTools,
}

impl BrewTool {
    pub fn brew_args(self) -> &'static [&'static str] {
        match self {
            Self::Ollama => &["install", "ollama"],
            Self::AndroidPlatformTools => &["install", "--cask", "android-platform-tools"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::AndroidPlatformTools => "android-platform-tools",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstallToolRequest {
    pub tool: BrewTool,
}
