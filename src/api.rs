use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{CliError, redact_secret, with_debug_hint};

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    headers: Vec<(String, String)>,
    debug: bool,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub request_id: Option<String>,
    pub elapsed_ms: u128,
    pub json: Value,
}

/// A completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub elapsed_ms: u128,
    pub text: String,
}

impl RawResponse {
    pub fn json(&self) -> Value {
        parse_body(&self.text)
    }
}

impl ApiClient {
    pub fn new(
        base_url: String,
        token: Option<String>,
        timeout_ms: u64,
        debug: bool,
    ) -> Result<Self, CliError> {
        let timeout = Duration::from_millis(timeout_ms.max(1));
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token,
            headers: Vec::new(),
            debug,
        })
    }

    /// Send `name: value` with every request. The value is treated as a secret.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// POST a JSON body, mapping non-success statuses to errors.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse, CliError> {
        let raw = self.post_raw(path, body).await?;
        let parsed = raw.json();
        if raw.status.is_success() {
            return Ok(ApiResponse {
                request_id: raw.request_id,
                elapsed_ms: raw.elapsed_ms,
                json: parsed,
            });
        }
        Err(self.http_error(raw.status, raw.request_id, parsed))
    }

    /// POST a JSON body and hand back whatever came back. Only transport faults are errors.
    pub async fn post_raw(&self, path: &str, body: &Value) -> Result<RawResponse, CliError> {
        let url = join_url(&self.base_url, path);
        let started = Instant::now();
        let mut request = self.client.post(url).json(body);

        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(ref bearer) = self.token {
            request = request.bearer_auth(bearer);
        }

        let resp = request.send().await.map_err(|err| {
            let message = if err.is_timeout() {
                "Request timed out.".to_string()
            } else {
                format!("Network request failed: {}", self.redact(&err.to_string()))
            };
            CliError::Network(with_debug_hint(&message, self.debug))
        })?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = resp.text().await.map_err(|err| {
            let message = format!("Failed reading response body: {}", self.redact(&err.to_string()));
            CliError::Network(with_debug_hint(&message, self.debug))
        })?;
        let elapsed_ms = started.elapsed().as_millis();
        debug!(path, status = status.as_u16(), elapsed_ms, "http exchange finished");

        Ok(RawResponse {
            status,
            request_id,
            elapsed_ms,
            text,
        })
    }

    fn http_error(
        &self,
        status: StatusCode,
        request_id: Option<String>,
        payload: Value,
    ) -> CliError {
        let error = payload
            .get("error")
            .and_then(|v| v.as_str())
            .or_else(|| payload.get("message").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        let mut details = match payload.get("details").and_then(|v| v.as_str()) {
            Some(extra) if !extra.trim().is_empty() => format!("{error} Details: {extra}"),
            _ => error,
        };
        if let Some(id) = request_id {
            details.push_str(&format!(" (request_id: {id})"));
        }
        if self.debug {
            details.push_str(&format!(" payload={payload}"));
        } else {
            details = with_debug_hint(&details, false);
        }

        CliError::from_status(status.as_u16(), self.redact(&details))
    }

    fn redact(&self, text: &str) -> String {
        let secrets = self
            .token
            .iter()
            .chain(self.headers.iter().map(|(_, value)| value))
            .filter(|secret| !secret.is_empty());
        let mut out = text.to_string();
        for secret in secrets {
            out = out.replace(secret.as_str(), &redact_secret(secret));
        }
        out
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str::<Value>(text).unwrap_or_else(|_| json!({ "raw": text }))
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
