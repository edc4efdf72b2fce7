//! OpenRouter chat-completions client

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::{PaletteAnalyzer, image_prep, prompt};
use crate::config::AnalyzerConfig;
use crate::errors::AnalysisError;
use crate::models::{AnalysisHints, Palette};

const REFERER: &str = "https://github.com/mgabor3141/dailyhues";
const APP_TITLE: &str = "dailyhues";

/// A JSON object, allowing one level of nested objects
static OBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("object pattern is valid")
});

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9_-]").expect("filename pattern is valid")
});

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    reasoning: Reasoning,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Reasoning {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Serialize)]
struct DebugDump<'a> {
    timestamp: String,
    image_hash: &'a str,
    image_name: &'a str,
    image_size_bytes: usize,
    model: &'a str,
    content: &'a str,
    parsed_colors: &'a Palette,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<&'a Usage>,
    raw_response: &'a ChatResponse,
}

pub struct OpenRouterAnalyzer {
    client: Client,
    config: AnalyzerConfig,
}

impl OpenRouterAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str, AnalysisError> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AnalysisError::MissingApiKey)
    }

    async fn send(&self, api_key: &str, request: &ChatRequest<'_>) -> Result<ChatResponse, AnalysisError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AnalysisError::Http {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn save_debug_dump(
        &self,
        dir: &Path,
        hints: &AnalysisHints,
        image_size: usize,
        response: &ChatResponse,
        content: &str,
        palette: &Palette,
    ) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;

        let dump = DebugDump {
            timestamp: Utc::now().to_rfc3339(),
            image_hash: hints.fingerprint.as_str(),
            image_name: &hints.title,
            image_size_bytes: image_size,
            model: &self.config.model,
            content,
            parsed_colors: palette,
            usage: response.usage.as_ref(),
            raw_response: response,
        };
        let json = serde_json::to_vec_pretty(&dump)?;

        let path = dir.join(debug_file_name(hints, &Utc::now().format("%Y-%m-%d").to_string()));
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[async_trait]
impl PaletteAnalyzer for OpenRouterAnalyzer {
    async fn analyze(&self, bytes: &[u8], hints: &AnalysisHints) -> Result<Palette, AnalysisError> {
        let api_key = self.api_key()?;
        let image = image_prep::prepare(bytes, self.config.max_image_height)?;

        let request = ChatRequest {
            model: &self.config.model,
            reasoning: Reasoning { enabled: true },
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image.data_uri() },
                    },
                    ContentPart::Text {
                        text: prompt::build(&hints.title, &hints.copyright),
                    },
                ],
            }],
        };

        debug!(
            fingerprint = %hints.fingerprint.short(12),
            model = %self.config.model,
            upload_bytes = image.bytes.len(),
            "Requesting palette analysis"
        );

        let response = self.send(api_key, &request).await?;

        if let Some(error) = &response.error {
            return Err(AnalysisError::Api {
                message: error.message.clone(),
                code: match &error.code {
                    serde_json::Value::String(code) => code.clone(),
                    other => other.to_string(),
                },
            });
        }

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or(AnalysisError::EmptyResponse)?;

        let palette = parse_palette(content)?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Palette analysis token usage"
            );
        }

        if let Some(dir) = &self.config.debug_dir {
            match self
                .save_debug_dump(dir, hints, bytes.len(), &response, content, &palette)
                .await
            {
                Ok(path) => info!("Debug response saved to {}", path.display()),
                Err(e) => warn!("Failed to save debug response: {}", e),
            }
        }

        Ok(palette)
    }
}

/// Extract the palette object from a model reply.
///
/// The whole reply is tried as JSON first; failing that, the first
/// `{...}` object embedded in the text is used.
pub fn parse_palette(content: &str) -> Result<Palette, AnalysisError> {
    if let Ok(palette) = serde_json::from_str::<Palette>(content.trim()) {
        return Ok(palette);
    }

    OBJECT_PATTERN
        .find(content)
        .and_then(|m| serde_json::from_str::<Palette>(m.as_str()).ok())
        .ok_or_else(|| AnalysisError::Unparseable {
            content: truncate(content, 512),
        })
}

/// `<date>_<sanitized title>_<fingerprint prefix>.json`
fn debug_file_name(hints: &AnalysisHints, date: &str) -> String {
    let sanitized = UNSAFE_FILENAME_CHARS.replace_all(&hints.title, "_");
    let sanitized: String = sanitized.chars().take(50).collect();
    format!("{date}_{sanitized}_{}.json", hints.fingerprint.short(12))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}
