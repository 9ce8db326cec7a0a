//! Engine configuration (`config.yaml`) and its projection into the
//! environment of spawned engine processes.

pub mod types;

#[cfg(feature = "desktop")]
pub mod commands;

use std::path::Path;

use serde_yaml::Value;

use crate::error::Result;
use crate::utils::fs::write_atomic;
pub use types::EngineConfig;

impl EngineConfig {
    /// What a fresh install runs with: a local Ollama vision model.
    pub fn defaults() -> Self {
        Self {
            model: Some("local".into()),
            model_provider: Some("ollama".into()),
            api_base_url: Some("https://api.openai.com/v1/chat/completions".into()),
            api_model: Some("gpt-4o-mini".into()),
            local_model: Some("qwen3-vl:4b".into()),
            temperature: Some(0.0),
            max_tokens: Some(4096),
            max_rounds: Some(20),
            request_interval: Some(10),
            request_timeout: Some(120),
            web_browser_type: Some("chromium".into()),
            web_headless: Some(false),
            web_viewport_width: Some(1280),
            web_viewport_height: Some(720),
            image_max_width: Some(1280),
            image_max_height: Some(1280),
            image_quality: Some(85),
            optimize_images: Some(true),
            dark_mode: Some(false),
            min_dist: Some(30),
            doc_refine: Some(false),
            android_screenshot_dir: Some("/sdcard".into()),
            android_xml_dir: Some("/sdcard".into()),
            ..Self::default()
        }
    }

    /// Load `path`; a missing or empty file yields [`EngineConfig::defaults`].
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no engine config yet, using defaults");
                return Ok(Self::defaults());
            }
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::defaults());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        write_atomic(path, content.as_bytes()).await?;
        tracing::info!(path = %path.display(), "engine config saved");
        Ok(())
    }

    /// Every scalar key as an environment variable of the same name.
    pub fn to_env(&self) -> Result<Vec<(String, String)>> {
        let Value::Mapping(mapping) = serde_yaml::to_value(self)? else {
            return Ok(Vec::new());
        };
        let vars = mapping
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.as_str()?.to_string();
                let value = match value {
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key, value))
            })
            .collect();
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("config.yaml"))
            .await
            .unwrap();
        assert_eq!(config, EngineConfig::defaults());
    }

    #[tokio::test]
    async fn test_unknown_keys_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "MODEL: api\nAPI_KEY: sk-test\nMAX_ROUNDS: 5\nCUSTOM_FLAG: yes-please\n",
        )
        .unwrap();

        let mut config = EngineConfig::load(&path).await.unwrap();
        assert_eq!(config.model.as_deref(), Some("api"));
        assert_eq!(config.max_rounds, Some(5));
        config.temperature = Some(0.3);
        config.save(&path).await.unwrap();

        let reloaded = EngineConfig::load(&path).await.unwrap();
        assert_eq!(reloaded.temperature, Some(0.3));
        assert_eq!(
            reloaded.extra.get("CUSTOM_FLAG"),
            Some(&Value::String("yes-please".into()))
        );
    }

    #[test]
    fn test_to_env_stringifies_scalars() {
        let config = EngineConfig {
            model: Some("local".into()),
            web_headless: Some(true),
            max_rounds: Some(2),
            temperature: Some(0.5),
            ..EngineConfig::default()
        };
        let env = config.to_env().unwrap();
        assert!(env.contains(&("MODEL".to_string(), "local".to_string())));
        assert!(env.contains(&("WEB_HEADLESS".to_string(), "true".to_string())));
        assert!(env.contains(&("MAX_ROUNDS".to_string(), "2".to_string())));
        assert!(env.contains(&("TEMPERATURE".to_string(), "0.5".to_string())));
        assert!(!env.iter().any(|(key, _)| key == "API_KEY"));
    }
}
