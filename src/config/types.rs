use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Engine configuration as stored in `config.yaml`. Keys keep the
/// engine's upper-case spelling so the file stays hand-editable and the
/// same names double as environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `api` or `local`.
    #[serde(rename = "MODEL", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "MODEL_PROVIDER", default, skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
    #[serde(rename = "MODEL_NAME", default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(rename = "API_BASE_URL", default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(rename = "API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "API_MODEL", default, skip_serializing_if = "Option::is_none")]
    pub api_model: Option<String>,
    #[serde(rename = "LOCAL_MODEL", default, skip_serializing_if = "Option::is_none")]
    pub local_model: Option<String>,

    #[serde(rename = "TEMPERATURE", default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "MAX_TOKENS", default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(rename = "MAX_ROUNDS", default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(rename = "REQUEST_INTERVAL", default, skip_serializing_if = "Option::is_none")]
    pub request_interval: Option<u32>,
    #[serde(rename = "REQUEST_TIMEOUT", default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u32>,

    #[serde(rename = "WEB_BROWSER_TYPE", default, skip_serializing_if = "Option::is_none")]
    pub web_browser_type: Option<String>,
    #[serde(rename = "WEB_HEADLESS", default, skip_serializing_if = "Option::is_none")]
    pub web_headless: Option<bool>,
    #[serde(rename = "WEB_VIEWPORT_WIDTH", default, skip_serializing_if = "Option::is_none")]
    pub web_viewport_width: Option<u32>,
    #[serde(rename = "WEB_VIEWPORT_HEIGHT", default, skip_serializing_if = "Option::is_none")]
    pub web_viewport_height: Option<u32>,

    #[serde(rename = "IMAGE_MAX_WIDTH", default, skip_serializing_if = "Option::is_none")]
    pub image_max_width: Option<u32>,
    #[serde(rename = "IMAGE_MAX_HEIGHT", default, skip_serializing_if = "Option::is_none")]
    pub image_max_height: Option<u32>,
    #[serde(rename = "IMAGE_QUALITY", default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<u32>,
    #[serde(rename = "OPTIMIZE_IMAGES", default, skip_serializing_if = "Option::is_none")]
    pub optimize_images: Option<bool>,

    #[serde(rename = "DARK_MODE", default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(rename = "MIN_DIST", default, skip_serializing_if = "Option::is_none")]
    pub min_dist: Option<u32>,
    #[serde(rename = "DOC_REFINE", default, skip_serializing_if = "Option::is_none")]
    pub doc_refine: Option<bool>,
    #[serde(rename = "ANDROID_SCREENSHOT_DIR", default, skip_serializing_if = "Option::is_none")]
    pub android_screenshot_dir: Option<String>,
    #[serde(rename = "ANDROID_XML_DIR", default, skip_serializing_if = "Option::is_none")]
    pub android_xml_dir: Option<String>,

    /// Keys this app does not know about, kept as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}
