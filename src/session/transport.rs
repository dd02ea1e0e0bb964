// Ways to carry one chat turn to the relay.

use std::future::Future;

use tracing::debug;

use crate::api::ApiClient;
use crate::errors::CliError;
use crate::relay::gemini::GeminiBackend;
use crate::relay::handler::Relay;
use crate::relay::policy::ModelBackend;
use crate::relay::wire::{ChatRequest, ChatResponse, failure_error};

pub const CHAT_PATH: &str = "/api/chat";

pub trait ChatTransport {
    fn send(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, CliError>> + Send;
}

/// Runs the relay in-process.
#[derive(Debug, Clone)]
pub struct LocalTransport<B> {
    relay: Relay<B>,
}

impl<B> LocalTransport<B> {
    pub fn new(relay: Relay<B>) -> Self {
        Self { relay }
    }
}

impl<B: ModelBackend + Sync> ChatTransport for LocalTransport<B> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CliError> {
        let response = self.relay.handle_chat(request).await;
        debug!(status = response.status, "local relay answered");
        response.into_reply()
    }
}

/// Talks to a remote relay over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    api: ApiClient,
}

impl HttpTransport {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CliError> {
        let body = serde_json::to_value(request)?;
        let res = self
            .api
            .post_json(CHAT_PATH, &body)
            .await
            .map_err(|err| match err {
                CliError::Upstream { status, message } => failure_error(status, message),
                other => other,
            })?;
        debug!(request_id = ?res.request_id, elapsed_ms = res.elapsed_ms, "remote relay answered");
        serde_json::from_value(res.json).map_err(|err| {
            CliError::Server(format!("Unexpected chat response from relay: {err}"))
        })
    }
}

/// Transport picked from configuration at startup.
#[derive(Debug, Clone)]
pub enum Transport {
    Local(LocalTransport<GeminiBackend>),
    Http(HttpTransport),
}

impl ChatTransport for Transport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, CliError> {
        match self {
            Transport::Local(local) => local.send(request).await,
            Transport::Http(http) => http.send(request).await,
        }
    }
}
