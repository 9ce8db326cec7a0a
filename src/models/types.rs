use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAI,
    OpenRouter,
    Anthropic,
    Xai,
}

impl Provider {
    /// Base for the OpenAI-compatible chat endpoint, or the Ollama server.
    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Xai => "https://api.x.ai/v1",
        }
    }

    /// Host root the model catalogue is fetched from.
    pub fn default_catalog_base(self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAI => "https://api.openai.com",
            Self::OpenRouter => "https://openrouter.ai",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Xai => "https://api.x.ai",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestModelRequest {
    pub provider: Provider,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl TestModelRequest {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(AppError::invalid("model must not be empty"));
        }
        validate_base(self.base_url.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FetchModelsRequest {
    pub provider: Provider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl FetchModelsRequest {
    pub fn validate(&self) -> Result<()> {
        validate_base(self.base_url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTestResponse {
    pub message: String,
}

fn validate_base(base: Option<&str>) -> Result<()> {
    match base.filter(|b| !b.trim().is_empty()) {
        Some(base) => crate::projects::types::validate_url(base),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        let req: FetchModelsRequest =
            serde_json::from_str(r#"{"provider":"openrouter","apiKey":"k"}"#).unwrap();
        assert_eq!(req.provider, Provider::OpenRouter);
        assert!(serde_json::from_str::<FetchModelsRequest>(r#"{"provider":"bard"}"#).is_err());
    }

    #[test]
    fn test_base_must_be_http() {
        let req = TestModelRequest {
            provider: Provider::OpenAI,
            model: "gpt-4o".into(),
            base_url: Some("file:///etc/passwd".into()),
            api_key: None,
        };
        assert!(req.validate().is_err());
    }
}
