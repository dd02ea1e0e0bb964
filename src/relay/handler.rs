//! Server-side chat turn: validation, credential check, invocation, and the
//! mapping of every failure onto `{error, details}` plus a status code.

use serde_json::{Value, json};
use tracing::{error, info};

use crate::errors::CliError;
use crate::relay::gemini::GenerateRequest;
use crate::relay::policy::{InvokeError, ModelBackend, invoke};
use crate::relay::wire::{ChatFailure, ChatRequest, ChatResponse, NOT_CONFIGURED, failure_error};

#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: u16,
    pub body: Value,
}

impl RelayResponse {
    fn ok(response: &ChatResponse) -> Self {
        Self {
            status: 200,
            body: serde_json::to_value(response).unwrap_or_else(|_| json!({})),
        }
    }

    fn fail(status: u16, failure: ChatFailure) -> Self {
        Self {
            status,
            body: serde_json::to_value(&failure)
                .unwrap_or_else(|_| json!({ "error": failure.error })),
        }
    }

    /// Client view of the response: the reply, or an error classified by status.
    pub fn into_reply(self) -> Result<ChatResponse, CliError> {
        if self.status == 200 {
            return Ok(serde_json::from_value(self.body)?);
        }
        let failure: ChatFailure = serde_json::from_value(self.body)?;
        Err(failure_error(self.status, failure.describe()))
    }
}

/// The relay owns a backend only when a credential was configured.
#[derive(Debug, Clone)]
pub struct Relay<B> {
    backend: Option<B>,
    primary_model: String,
    fallback_model: String,
}

impl<B: ModelBackend> Relay<B> {
    /// Model ids are trimmed here once; everything downstream compares them as given.
    pub fn new(backend: Option<B>, primary_model: String, fallback_model: String) -> Self {
        Self {
            backend,
            primary_model: primary_model.trim().to_string(),
            fallback_model: fallback_model.trim().to_string(),
        }
    }

    /// Entry point for an untyped JSON body.
    pub async fn handle_json(&self, body: Value) -> RelayResponse {
        match serde_json::from_value::<ChatRequest>(body) {
            Ok(request) => self.handle_chat(&request).await,
            Err(err) => RelayResponse::fail(
                400,
                ChatFailure::new("Message must be text.", Some(err.to_string())),
            ),
        }
    }

    pub async fn handle_chat(&self, request: &ChatRequest) -> RelayResponse {
        if request.message.trim().is_empty() {
            return RelayResponse::fail(400, ChatFailure::new("Message is required.", None));
        }

        let Some(backend) = &self.backend else {
            return RelayResponse::fail(
                503,
                ChatFailure::new(
                    NOT_CONFIGURED,
                    Some(
                        "No API key configured. Set GEMINI_API_KEY or run `chatrelay config set apiKey <key>`."
                            .to_string(),
                    ),
                ),
            );
        };

        let payload = GenerateRequest::from_turns(&request.history, &request.message);
        match invoke(backend, &self.primary_model, &self.fallback_model, &payload).await {
            Ok(invocation) => {
                info!(model = %invocation.used_model, usage = %invocation.usage, "chat turn answered");
                RelayResponse::ok(&ChatResponse {
                    reply: invocation.reply,
                    notice: invocation.notice,
                    model: Some(invocation.used_model),
                })
            }
            Err(err) => {
                let status = err.status();
                let title = match &err {
                    InvokeError::Upstream { .. } => "Upstream model request failed.",
                    InvokeError::EmptyReply { .. } => "The model returned no text.",
                    InvokeError::Transport(_) => "Internal server error.",
                };
                error!(status, error = %err, "chat turn failed");
                RelayResponse::fail(status, ChatFailure::new(title, Some(err.detail())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::relay::policy::InvocationResult;
    use crate::relay::policy::tests::{ScriptedBackend, text_payload};
    use crate::relay::wire::ConversationEntry;

    fn relay(backend: ScriptedBackend) -> Relay<ScriptedBackend> {
        Relay::new(Some(backend), "main".into(), "backup".into())
    }

    fn chat(message: &str) -> ChatRequest {
        ChatRequest {
            history: vec![ConversationEntry::user("earlier"), ConversationEntry::model("ok")],
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_network() {
        let relay = relay(ScriptedBackend::default());
        let res = relay.handle_chat(&chat("   ")).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Message is required.");
        assert!(relay.backend.as_ref().map(|b| b.calls().is_empty()).unwrap_or(false));
    }

    #[tokio::test]
    async fn non_text_message_is_rejected() {
        let relay = relay(ScriptedBackend::default());
        let res = relay.handle_json(json!({ "message": 42 })).await;
        assert_eq!(res.status, 400);
        let res = relay.handle_json(json!({ "history": [] })).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn missing_credential_is_service_unavailable() {
        let relay: Relay<ScriptedBackend> = Relay::new(None, "main".into(), "backup".into());
        let res = relay.handle_chat(&chat("hello")).await;
        assert_eq!(res.status, 503);
        assert!(res.body["details"].as_str().unwrap_or("").contains("GEMINI_API_KEY"));

        let err = res.into_reply().expect_err("not configured");
        assert!(matches!(err, CliError::Config(_)), "{err:?}");
        assert_eq!(err.exit_code(), 7);
    }

    #[tokio::test]
    async fn upstream_unavailable_is_not_a_setup_error() {
        let relay = relay(
            ScriptedBackend::default().with(InvocationResult::failure("main", 503, "overloaded")),
        );
        let err = relay.handle_chat(&chat("hello")).await.into_reply().expect_err("failure");
        assert!(matches!(err, CliError::Upstream { status: 503, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn model_ids_are_trimmed_once() {
        let relay = Relay::new(
            Some(
                ScriptedBackend::default()
                    .with(InvocationResult::failure("main", 404, "gone"))
                    .with(InvocationResult::failure("backup", 404, "gone too")),
            ),
            " main ".into(),
            "main\n".into(),
        );
        let res = relay.handle_chat(&chat("hello")).await;
        assert_eq!(res.status, 404);
        let calls = relay.backend.as_ref().map(|b| b.calls()).unwrap_or_default();
        assert_eq!(calls, vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn success_carries_reply_and_notice() {
        let relay = relay(
            ScriptedBackend::default()
                .with(InvocationResult::failure("main", 404, "gone"))
                .with(InvocationResult::success("backup", 200, text_payload("hi there"))),
        );
        let res = relay.handle_json(json!({ "history": [], "message": "hello" })).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["reply"], "hi there");
        assert_eq!(res.body["model"], "backup");
        assert!(res.body["notice"].as_str().is_some());

        let reply = res.into_reply().expect("reply");
        assert_eq!(reply.reply, "hi there");
    }

    #[tokio::test]
    async fn upstream_status_is_propagated() {
        let relay = relay(
            ScriptedBackend::default().with(InvocationResult::failure("main", 403, "denied")),
        );
        let res = relay.handle_chat(&chat("hello")).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["details"], "denied");
    }

    #[tokio::test]
    async fn empty_reply_is_bad_gateway() {
        let relay = relay(ScriptedBackend::default().with(InvocationResult::success(
            "main",
            200,
            json!({ "candidates": [] }),
        )));
        let res = relay.handle_chat(&chat("hello")).await;
        assert_eq!(res.status, 502);
    }

    #[tokio::test]
    async fn transport_fault_is_internal_error() {
        let relay = relay(ScriptedBackend::default());
        let res = relay.handle_chat(&chat("hello")).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["error"], "Internal server error.");

        let err = res.into_reply().expect_err("failure");
        assert_eq!(err.status(), 500);
        assert!(err.to_string().contains("Internal server error."));
    }
}
