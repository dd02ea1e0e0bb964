//! Chat wire contract shared by the relay and its clients.

use serde::{Deserialize, Serialize};

use crate::errors::CliError;

/// Title of the relay's answer when no upstream credential is configured.
pub const NOT_CONFIGURED: &str = "Service is not configured.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ConversationEntry>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ChatFailure {
    pub fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
        }
    }

    /// One-line description combining the error and its details.
    pub fn describe(&self) -> String {
        match &self.details {
            Some(details) if !details.trim().is_empty() => format!("{} Details: {details}", self.error),
            _ => self.error.clone(),
        }
    }
}

/// Client-side error for a failed turn. The relay's own missing-credential
/// answer is a setup problem; every other status is classified as usual.
pub fn failure_error(status: u16, message: String) -> CliError {
    if status == 503 && message.starts_with(NOT_CONFIGURED) {
        return CliError::Config(message);
    }
    CliError::from_status(status, message)
}
