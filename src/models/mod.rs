//! Connectivity checks and model catalogues for the supported providers.

pub mod types;

#[cfg(feature = "desktop")]
pub mod commands;

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::state::AppState;
use types::{FetchModelsRequest, ModelTestResponse, Provider, TestModelRequest};

const TEST_TIMEOUT: Duration = Duration::from_secs(30);
const TEST_PROMPT: &str = "Reply with the single word: ok";

const ANTHROPIC_MODELS: &[&str] = &[
    "claude-sonnet-4-5",
    "claude-opus-4-1",
    "claude-3-5-haiku-latest",
];
const XAI_MODELS: &[&str] = &["grok-4", "grok-2-vision-1212"];

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterModel {
    id: String,
    #[serde(default)]
    architecture: Option<Architecture>,
}

#[derive(Debug, Deserialize)]
struct Architecture {
    #[serde(default)]
    input_modalities: Vec<String>,
}

/// Check that `req.model` is usable. Failures come back as `Provider`
/// errors carrying a message fit for the settings screen.
pub async fn test_model(state: &AppState, req: TestModelRequest) -> Result<ModelTestResponse> {
    req.validate()?;
    let base = base_or(req.base_url.as_deref(), req.provider.default_api_base());
    tracing::info!(provider = ?req.provider, model = %req.model, %base, "testing model connectivity");
    match req.provider {
        Provider::Ollama => test_ollama(&state.http, base, &req.model).await,
        _ => test_chat_completion(&state.http, base, req.api_key.as_deref(), &req.model).await,
    }
}

pub async fn fetch_models(state: &AppState, req: FetchModelsRequest) -> Result<Vec<String>> {
    req.validate()?;
    let base = base_or(req.base_url.as_deref(), req.provider.default_catalog_base());
    let key = req.api_key.as_deref();
    match req.provider {
        Provider::Ollama => Ok(ollama_tags(&state.http, base)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect()),
        Provider::OpenAI => fetch_openai(&state.http, base, key).await,
        Provider::OpenRouter => fetch_openrouter(&state.http, base, key).await,
        Provider::Anthropic => Ok(ANTHROPIC_MODELS.iter().map(|m| m.to_string()).collect()),
        Provider::Xai => Ok(XAI_MODELS.iter().map(|m| m.to_string()).collect()),
    }
}

async fn test_ollama(http: &reqwest::Client, base: &str, model: &str) -> Result<ModelTestResponse> {
    let names: Vec<String> = ollama_tags(http, base)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    let tagged = format!("{}:latest", model);
    if names.iter().any(|n| n == model || *n == tagged) {
        Ok(ModelTestResponse {
            message: format!("Ollama is running and {} is available", model),
        })
    } else {
        Err(AppError::Provider(format!(
            "model {} is not installed in Ollama; pull it first",
            model
        )))
    }
}

async fn ollama_tags(http: &reqwest::Client, base: &str) -> Result<Vec<OllamaTag>> {
    let url = format!("{}/api/tags", base);
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|err| unreachable(&url, err))?;
    if !response.status().is_success() {
        return Err(AppError::Provider(format!(
            "Ollama returned HTTP {}",
            response.status().as_u16()
        )));
    }
    Ok(response.json::<OllamaTags>().await?.models)
}

async fn test_chat_completion(
    http: &reqwest::Client,
    base: &str,
    api_key: Option<&str>,
    model: &str,
) -> Result<ModelTestResponse> {
    let url = chat_completions_url(base);
    let body = json!({
        "model": model,
        "messages": [{"role": "user", "content": TEST_PROMPT}],
        "max_tokens": 5,
    });
    let mut request = http.post(&url).timeout(TEST_TIMEOUT).json(&body);
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        request = request.bearer_auth(key);
    }
    let response = request.send().await.map_err(|err| unreachable(&url, err))?;

    let status = response.status();
    let payload: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
    if status != reqwest::StatusCode::OK {
        let detail = payload
            .pointer("/error/message")
            .and_then(|m| m.as_str())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"));
        return Err(AppError::Provider(format!(
            "HTTP {}: {}",
            status.as_u16(),
            detail
        )));
    }

    let has_choices = payload
        .get("choices")
        .and_then(|c| c.as_array())
        .is_some_and(|c| !c.is_empty());
    if !has_choices {
        return Err(AppError::Provider(
            "the endpoint answered without any choices".to_string(),
        ));
    }
    Ok(ModelTestResponse {
        message: format!("{} responded successfully", model),
    })
}

async fn fetch_openai(http: &reqwest::Client, base: &str, api_key: Option<&str>) -> Result<Vec<String>> {
    let list: ModelList<OpenAIModel> = get_catalog(http, &format!("{}/v1/models", base), api_key).await?;
    let mut ids: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
    ids.sort();
    Ok(ids)
}

/// Only vision-capable models; the engine works from screenshots.
async fn fetch_openrouter(
    http: &reqwest::Client,
    base: &str,
    api_key: Option<&str>,
) -> Result<Vec<String>> {
    let list: ModelList<OpenRouterModel> =
        get_catalog(http, &format!("{}/api/v1/models", base), api_key).await?;
    Ok(list
        .data
        .into_iter()
        .filter(|m| {
            m.architecture
                .as_ref()
                .is_some_and(|a| a.input_modalities.iter().any(|i| i == "image"))
        })
        .map(|m| m.id)
        .collect())
}

async fn get_catalog<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
) -> Result<T> {
    let mut request = http.get(url);
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        request = request.bearer_auth(key);
    }
    let response = request.send().await.map_err(|err| unreachable(url, err))?;
    if !response.status().is_success() {
        return Err(AppError::Provider(format!(
            "{} returned HTTP {}",
            url,
            response.status().as_u16()
        )));
    }
    Ok(response.json().await?)
}

fn chat_completions_url(base: &str) -> String {
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

fn base_or<'a>(custom: Option<&'a str>, default: &'a str) -> &'a str {
    custom
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
}

fn unreachable(url: &str, err: reqwest::Error) -> AppError {
    AppError::Provider(format!("cannot reach {}: {}", url, err))
}
