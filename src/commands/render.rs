use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::app::Runtime;
use crate::errors::CliError;
use crate::render::{is_truncated, render};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Markdown file to render. Reads stdin when omitted.
    pub path: Option<PathBuf>,
}

pub async fn handle(runtime: &Runtime, args: RenderArgs) -> Result<(), CliError> {
    let source = match &args.path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::Usage(format!("Failed reading {}: {e}", path.display()))
        })?,
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| CliError::Generic(format!("Failed reading stdin: {e}")))?;
            input
        }
    };

    let max_chars = runtime.max_render_chars();
    let html = render(&source, max_chars);

    runtime
        .output
        .print_fragment(&html, json!({ "truncated": is_truncated(&source, max_chars) }))
}
