// Upstream generative-language backend (generateContent).

use serde::Serialize;
use tracing::info;
use url::Url;

use crate::api::ApiClient;
use crate::errors::CliError;
use crate::relay::policy::{InvocationResult, ModelBackend};
use crate::relay::wire::ConversationEntry;

pub const DEFAULT_UPSTREAM_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    pub text: String,
}

impl GenerateRequest {
    /// Prior turns in order, followed by the new user message.
    pub fn from_turns(history: &[ConversationEntry], message: &str) -> Self {
        let mut contents: Vec<Content> = history
            .iter()
            .filter(|entry| !entry.text.trim().is_empty())
            .map(|entry| Content {
                role: entry.role.as_str().to_string(),
                parts: vec![Part {
                    text: entry.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: message.to_string(),
            }],
        });
        Self { contents }
    }
}

pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// `/v1beta/models/<model>:generateContent` with the model id encoded as one path segment.
pub fn generate_path(model: &str) -> Result<String, CliError> {
    let mut url = Url::parse("http://upstream/v1beta/models")?;
    url.path_segments_mut()
        .map_err(|_| CliError::Generic("Upstream URL cannot carry a path.".to_string()))?
        .push(&format!("{model}:generateContent"));
    Ok(url.path().to_string())
}

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    api: ApiClient,
}

impl GeminiBackend {
    pub fn new(api: ApiClient, api_key: &str) -> Self {
        Self {
            api: api.with_header(API_KEY_HEADER, api_key),
        }
    }
}

impl ModelBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<InvocationResult, CliError> {
        let path = generate_path(model)?;
        let body = serde_json::to_value(request)?;

        let raw = self.api.post_raw(&path, &body).await?;
        let status = raw.status.as_u16();
        info!(model, status, elapsed_ms = raw.elapsed_ms, "upstream attempt");

        if raw.status.is_success() {
            return Ok(InvocationResult::success(model, status, raw.json()));
        }
        Ok(InvocationResult::failure(model, status, raw.text))
    }
}
