use std::fs;
use std::path::PathBuf;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::Runtime;
use crate::errors::CliError;
use crate::session::controller::ChatSession;
use crate::session::types::ItemKind;

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Primary model for the session. Ignored when a remote relay is configured.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,
    /// Write the transcript as HTML to this file on exit
    #[arg(long)]
    pub save: Option<PathBuf>,
}

pub async fn handle(runtime: &Runtime, args: SessionArgs) -> Result<(), CliError> {
    let transport = runtime.transport(args.model.as_deref())?;
    let mut session = ChatSession::new(runtime.max_render_chars());
    runtime
        .output
        .print_verbose(&format!("session {}", session.id()));
    runtime
        .output
        .print_diagnostic("Type a message and press Enter. /history shows the turn count, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                runtime
                    .output
                    .print_human(&format!("{} entries", session.history().len()));
                continue;
            }
            _ => {}
        }

        let item = match session.submit(&transport, line).await {
            Ok(item) => Some(item.clone()),
            Err(_) => session
                .transcript()
                .last()
                .filter(|item| item.kind == ItemKind::Error)
                .cloned(),
        };
        if let Some(item) = item {
            runtime
                .output
                .print_item(&item, &session.status().line(), session.last_model())?;
        }
    }

    if let Some(path) = args.save {
        fs::write(&path, session.transcript_html())?;
        runtime
            .output
            .print_verbose(&format!("Transcript saved to {}", path.display()));
    }
    Ok(())
}
