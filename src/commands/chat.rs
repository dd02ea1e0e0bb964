use std::io::{self, Read};

use clap::Args;
use serde_json::json;

use crate::app::Runtime;
use crate::errors::CliError;
use crate::session::controller::ChatSession;
use crate::session::types::SessionStatus;

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Message text
    pub prompt: Option<String>,
    /// Primary model for this turn. Ignored when a remote relay is configured.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,
    /// Read the message from stdin
    #[arg(long)]
    pub stdin: bool,
    /// Print the reply text as returned instead of rendered HTML (ignored with --json)
    #[arg(long)]
    pub raw: bool,
}

pub async fn handle(runtime: &Runtime, args: ChatArgs) -> Result<(), CliError> {
    let prompt = resolve_prompt(&args)?;
    let transport = runtime.transport(args.model.as_deref())?;
    let mut session = ChatSession::new(runtime.max_render_chars());

    let html = session.submit(&transport, &prompt).await?.html.clone();
    let reply = session
        .history()
        .last()
        .map(|entry| entry.text.clone())
        .unwrap_or_default();
    let notice = match session.status() {
        SessionStatus::Notice(notice) => Some(notice.clone()),
        _ => None,
    };

    let meta = json!({
        "reply": reply,
        "notice": notice,
        "model": session.last_model(),
    });
    let fragment = if args.raw && !runtime.output.json { &reply } else { &html };
    runtime.output.print_fragment(fragment, meta)?;
    if let Some(notice) = &notice {
        runtime.output.print_diagnostic(notice);
    }
    runtime.output.print_verbose(&format!(
        "model={}",
        session.last_model().unwrap_or("-")
    ));

    Ok(())
}

fn resolve_prompt(args: &ChatArgs) -> Result<String, CliError> {
    if args.stdin {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| CliError::Generic(format!("Failed reading stdin: {e}")))?;
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            return Err(CliError::Usage(
                "No message provided via stdin. Pipe text or pass a message argument.".to_string(),
            ));
        }
        return Ok(trimmed);
    }

    match &args.prompt {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(CliError::Usage(
            "Missing message. Use `chatrelay chat \"...\"` or pass `--stdin`.".to_string(),
        )),
    }
}
