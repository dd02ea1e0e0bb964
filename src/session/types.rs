// Transcript types for an interactive chat session.

use crate::render::escape::escape_html;

pub const PENDING_HTML: &str = "<p class=\"pending\">…</p>";
pub const APOLOGY_HTML: &str = "<p class=\"error\">Sorry, something went wrong. Please try again.</p>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    User,
    Pending,
    Model,
    Error,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::User => "user",
            ItemKind::Pending => "pending",
            ItemKind::Model => "model",
            ItemKind::Error => "error",
        }
    }
}

/// One displayed message. `html` is always safe to insert as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptItem {
    pub kind: ItemKind,
    pub html: String,
}

impl TranscriptItem {
    pub fn user(text: &str) -> Self {
        Self {
            kind: ItemKind::User,
            html: format!("<p>{}</p>", escape_html(text)),
        }
    }

    pub fn pending() -> Self {
        Self {
            kind: ItemKind::Pending,
            html: PENDING_HTML.to_string(),
        }
    }

    pub fn model(html: String) -> Self {
        Self {
            kind: ItemKind::Model,
            html,
        }
    }

    pub fn error() -> Self {
        Self {
            kind: ItemKind::Error,
            html: APOLOGY_HTML.to_string(),
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"msg {}\">{}</div>",
            self.kind.as_str(),
            self.html
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Thinking,
    Notice(String),
    Failed(String),
}

impl SessionStatus {
    pub fn line(&self) -> String {
        match self {
            SessionStatus::Ready => "Ready.".to_string(),
            SessionStatus::Thinking => "Thinking…".to_string(),
            SessionStatus::Notice(notice) => notice.clone(),
            SessionStatus::Failed(reason) => format!("Error: {reason}"),
        }
    }
}
