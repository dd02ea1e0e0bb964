//! Primary/fallback model invocation.
//!
//! The primary model is tried first. Only a "not found" failure moves on to
//! the fallback model, and the two attempts are never issued concurrently.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::CliError;
use crate::parse::response::{extract_reply, extract_usage_line, no_text_detail};
use crate::relay::gemini::GenerateRequest;

const NOT_FOUND: u16 = 404;

/// Outcome of one upstream attempt. Built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub model: String,
    pub status: u16,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Data(Value),
    Detail(String),
}

impl InvocationResult {
    pub fn success(model: &str, status: u16, data: Value) -> Self {
        Self {
            model: model.to_string(),
            status,
            outcome: AttemptOutcome::Data(data),
        }
    }

    pub fn failure(model: &str, status: u16, detail: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            status,
            outcome: AttemptOutcome::Detail(detail.into()),
        }
    }

    pub fn ok(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Data(_))
    }

    fn detail(&self) -> &str {
        match &self.outcome {
            AttemptOutcome::Detail(detail) => detail,
            AttemptOutcome::Data(_) => "",
        }
    }
}

/// Something that can run one generation request against a named model.
pub trait ModelBackend {
    /// Errors are reserved for transport faults; upstream failures come back
    /// as a failed [`InvocationResult`].
    fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> impl Future<Output = Result<InvocationResult, CliError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub reply: String,
    pub used_model: String,
    pub notice: Option<String>,
    pub usage: String,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("upstream request failed with status {status}")]
    Upstream { status: u16, detail: String },
    #[error("model returned no usable text")]
    EmptyReply { detail: String },
    #[error(transparent)]
    Transport(#[from] CliError),
}

impl InvokeError {
    pub fn status(&self) -> u16 {
        match self {
            InvokeError::Upstream { status, .. } => *status,
            InvokeError::EmptyReply { .. } => 502,
            InvokeError::Transport(_) => 500,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            InvokeError::Upstream { detail, .. } | InvokeError::EmptyReply { detail } => {
                detail.clone()
            }
            InvokeError::Transport(err) => err.to_string(),
        }
    }
}

enum Step {
    Primary,
    Fallback { primary: InvocationResult },
    Resolved(Result<Invocation, InvokeError>),
}

pub async fn invoke<B: ModelBackend>(
    backend: &B,
    primary_model: &str,
    fallback_model: &str,
    request: &GenerateRequest,
) -> Result<Invocation, InvokeError> {
    let mut step = Step::Primary;
    loop {
        step = match step {
            Step::Primary => {
                let attempt = backend.generate(primary_model, request).await?;
                after_primary(attempt, fallback_model)
            }
            Step::Fallback { primary } => {
                let attempt = backend.generate(fallback_model, request).await?;
                after_fallback(primary, attempt)
            }
            Step::Resolved(result) => return result,
        };
    }
}

fn after_primary(attempt: InvocationResult, fallback_model: &str) -> Step {
    info!(model = %attempt.model, status = attempt.status, ok = attempt.ok(), "primary attempt finished");
    if let AttemptOutcome::Data(data) = &attempt.outcome {
        return Step::Resolved(resolve_reply(data, &attempt.model, None));
    }

    if attempt.status == NOT_FOUND && !fallback_model.is_empty() && fallback_model != attempt.model {
        warn!(primary = %attempt.model, fallback = fallback_model, "primary model not found, trying fallback");
        return Step::Fallback { primary: attempt };
    }

    Step::Resolved(Err(InvokeError::Upstream {
        status: attempt.status,
        detail: attempt.detail().to_string(),
    }))
}

fn after_fallback(primary: InvocationResult, attempt: InvocationResult) -> Step {
    info!(model = %attempt.model, status = attempt.status, ok = attempt.ok(), "fallback attempt finished");
    match &attempt.outcome {
        AttemptOutcome::Data(data) => {
            let notice = format!(
                "Model {} is unavailable; answered with {} instead.",
                primary.model, attempt.model
            );
            Step::Resolved(resolve_reply(data, &attempt.model, Some(notice)))
        }
        AttemptOutcome::Detail(detail) => {
            warn!(primary = %primary.model, fallback = %attempt.model, "both models failed");
            Step::Resolved(Err(InvokeError::Upstream {
                status: attempt.status,
                detail: format!(
                    "[{}] {}\n[{}] {}",
                    primary.model,
                    primary.detail(),
                    attempt.model,
                    detail
                ),
            }))
        }
    }
}

fn resolve_reply(
    data: &Value,
    model: &str,
    notice: Option<String>,
) -> Result<Invocation, InvokeError> {
    match extract_reply(data) {
        Some(reply) => Ok(Invocation {
            reply,
            used_model: model.to_string(),
            notice,
            usage: extract_usage_line(data),
        }),
        None => {
            let detail = no_text_detail(data);
            warn!(model, %detail, "upstream returned no text");
            Err(InvokeError::EmptyReply { detail })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// Backend answering from a fixed table and recording every model it was asked for.
    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        pub answers: HashMap<String, InvocationResult>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn with(mut self, result: InvocationResult) -> Self {
            self.answers.insert(result.model.clone(), result);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl ModelBackend for ScriptedBackend {
        async fn generate(
            &self,
            model: &str,
            _request: &GenerateRequest,
        ) -> Result<InvocationResult, CliError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(model.to_string());
            }
            self.answers
                .get(model)
                .cloned()
                .ok_or_else(|| CliError::Network(format!("connection refused for {model}")))
        }
    }

    pub(crate) fn text_payload(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    fn request() -> GenerateRequest {
        GenerateRequest::from_turns(&[], "hi")
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let backend = ScriptedBackend::default()
            .with(InvocationResult::success("main", 200, text_payload("hello")));
        let out = invoke(&backend, "main", "backup", &request()).await.expect("reply");
        assert_eq!(out.reply, "hello");
        assert_eq!(out.used_model, "main");
        assert_eq!(out.notice, None);
        assert_eq!(backend.calls(), vec!["main"]);
    }

    #[tokio::test]
    async fn not_found_switches_to_fallback_with_notice() {
        let backend = ScriptedBackend::default()
            .with(InvocationResult::failure("main", 404, "model not found"))
            .with(InvocationResult::success("backup", 200, text_payload("from backup")));
        let out = invoke(&backend, "main", "backup", &request()).await.expect("reply");
        assert_eq!(out.reply, "from backup");
        assert_eq!(out.used_model, "backup");
        let notice = out.notice.expect("notice");
        assert!(notice.contains("main") && notice.contains("backup"));
        assert_eq!(backend.calls(), vec!["main", "backup"]);
    }

    #[tokio::test]
    async fn double_failure_keeps_both_diagnostics() {
        let backend = ScriptedBackend::default()
            .with(InvocationResult::failure("main", 404, "primary says no"))
            .with(InvocationResult::failure("backup", 429, "quota exhausted"));
        let err = invoke(&backend, "main", "backup", &request())
            .await
            .expect_err("failure");
        assert_eq!(err.status(), 429);
        let detail = err.detail();
        let primary_at = detail.find("primary says no").expect("primary detail");
        let fallback_at = detail.find("quota exhausted").expect("fallback detail");
        assert!(primary_at < fallback_at);
    }

    #[tokio::test]
    async fn other_failures_do_not_fall_back() {
        let backend = ScriptedBackend::default()
            .with(InvocationResult::failure("main", 500, "boom"))
            .with(InvocationResult::success("backup", 200, text_payload("unused")));
        let err = invoke(&backend, "main", "backup", &request())
            .await
            .expect_err("failure");
        assert_eq!(err.status(), 500);
        assert_eq!(err.detail(), "boom");
        assert_eq!(backend.calls(), vec!["main"]);
    }

    #[tokio::test]
    async fn same_model_never_retried() {
        let backend = ScriptedBackend::default()
            .with(InvocationResult::failure("main", 404, "missing"));
        let err = invoke(&backend, "main", "main", &request())
            .await
            .expect_err("failure");
        assert_eq!(err.status(), 404);
        assert_eq!(backend.calls(), vec!["main"]);
    }

    #[tokio::test]
    async fn empty_candidates_become_bad_gateway() {
        let backend = ScriptedBackend::default().with(InvocationResult::success(
            "main",
            200,
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
        ));
        let err = invoke(&backend, "main", "backup", &request())
            .await
            .expect_err("failure");
        assert_eq!(err.status(), 502);
        assert_eq!(err.detail(), "finishReason: SAFETY");
    }

    #[tokio::test]
    async fn transport_fault_surfaces_as_internal_error() {
        let backend = ScriptedBackend::default();
        let err = invoke(&backend, "main", "backup", &request())
            .await
            .expect_err("failure");
        assert_eq!(err.status(), 500);
        assert!(matches!(err, InvokeError::Transport(_)));
    }
}
