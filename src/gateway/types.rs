use serde::Serialize;
use serde_json::Value;

use crate::config;

/// Default floor on the interval between consecutive dispatches (ms).
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1100;
/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// One message in a `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

/// A single content part: prompt text or an embedded image.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(inline_data: InlineData) -> Self {
        Part::InlineData { inline_data }
    }
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Sampling parameters for one call. Serialized in the camelCase form the
/// service expects.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A request to the inference service, carrying everything the gateway
/// needs to dispatch it: model, credential, payload, and retry policy.
#[derive(Debug, Clone)]
pub struct GenerateContentRequest {
    pub model: String,
    pub api_key: Option<String>,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub min_interval_ms: u64,
    pub max_retries: u32,
}

impl GenerateContentRequest {
    /// Build a request with the default model, retry policy, and the API
    /// key currently present in the environment.
    pub fn new(contents: Vec<Content>, generation_config: GenerationConfig) -> Self {
        Self {
            model: config::DEFAULT_MODEL.to_string(),
            api_key: config::gemini_api_key(),
            contents,
            generation_config,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Successful gateway result: the concatenated text of the first
/// candidate's parts, plus the raw decoded body for callers that need more.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub text: String,
    pub raw: Value,
}
