//! Chat session controller.
//!
//! One turn is in flight at a time. The user message is shown right away with
//! a pending placeholder after it; the placeholder is later replaced in place
//! by the rendered reply or by an apology.

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::errors::CliError;
use crate::relay::wire::{ChatRequest, ChatResponse, ConversationEntry};
use crate::render::render;
use crate::session::transport::ChatTransport;
use crate::session::types::{SessionStatus, TranscriptItem};

#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    history: Vec<ConversationEntry>,
    transcript: Vec<TranscriptItem>,
    busy: bool,
    status: SessionStatus,
    last_model: Option<String>,
    max_render_chars: usize,
}

/// A dispatched turn waiting for its response.
#[derive(Debug)]
pub struct PendingTurn {
    slot: usize,
    request: ChatRequest,
}

impl PendingTurn {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

impl ChatSession {
    pub fn new(max_render_chars: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            transcript: Vec::new(),
            busy: false,
            status: SessionStatus::Ready,
            last_model: None,
            max_render_chars,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.history
    }

    pub fn transcript(&self) -> &[TranscriptItem] {
        &self.transcript
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Model that produced the latest reply, when the relay reported one.
    pub fn last_model(&self) -> Option<&str> {
        self.last_model.as_deref()
    }

    /// Record the user message and show the placeholder. Rejected while busy.
    pub fn begin_turn(&mut self, text: &str) -> Result<PendingTurn, CliError> {
        if self.busy {
            return Err(CliError::Usage(
                "A reply is still pending. Wait for it before sending another message.".to_string(),
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CliError::Usage("Message is empty.".to_string()));
        }

        let request = ChatRequest {
            history: self.history.clone(),
            message: text.to_string(),
        };
        self.history.push(ConversationEntry::user(text));
        self.transcript.push(TranscriptItem::user(text));
        self.transcript.push(TranscriptItem::pending());
        self.busy = true;
        self.status = SessionStatus::Thinking;

        info!(session = %self.id, turn = self.history.len(), "turn dispatched");
        Ok(PendingTurn {
            slot: self.transcript.len() - 1,
            request,
        })
    }

    /// Resolve the placeholder of `pending`. Only a reply extends the history.
    pub fn finish_turn(
        &mut self,
        pending: PendingTurn,
        result: Result<ChatResponse, CliError>,
    ) -> Result<&TranscriptItem, CliError> {
        self.busy = false;
        match result {
            Ok(response) => {
                let html = render(&response.reply, self.max_render_chars);
                self.transcript[pending.slot] = TranscriptItem::model(html);
                self.history.push(ConversationEntry::model(response.reply));
                self.status = match response.notice {
                    Some(notice) => SessionStatus::Notice(notice),
                    None => SessionStatus::Ready,
                };
                info!(session = %self.id, model = ?response.model, "turn answered");
                self.last_model = response.model;
                Ok(&self.transcript[pending.slot])
            }
            Err(err) => {
                self.transcript[pending.slot] = TranscriptItem::error();
                self.status = SessionStatus::Failed(err.to_string());
                warn!(session = %self.id, error = %err, "turn failed");
                Err(err)
            }
        }
    }

    /// Run one full turn through `transport`.
    pub async fn submit<T: ChatTransport>(
        &mut self,
        transport: &T,
        text: &str,
    ) -> Result<&TranscriptItem, CliError> {
        let pending = self.begin_turn(text)?;
        let result = transport
            .send(pending.request())
            .instrument(info_span!("turn", session = %self.id))
            .await;
        self.finish_turn(pending, result)
    }

    /// Whole transcript as one HTML fragment.
    pub fn transcript_html(&self) -> String {
        self.transcript
            .iter()
            .map(TranscriptItem::to_html)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
