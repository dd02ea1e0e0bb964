use std::io::{self, Read};

use clap::Args;
use serde_json::{Value, json};

use crate::app::Runtime;
use crate::errors::CliError;

#[derive(Debug, Args)]
pub struct RelayArgs {
    /// Primary model override
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,
}

/// Answer one `{history, message}` request read from stdin with `{status, body}`.
pub async fn handle(runtime: &Runtime, args: RelayArgs) -> Result<(), CliError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| CliError::Generic(format!("Failed reading stdin: {e}")))?;

    let relay = runtime.relay(args.model.as_deref())?;
    let response = match serde_json::from_str::<Value>(&input) {
        Ok(body) => relay.handle_json(body).await,
        Err(err) => {
            runtime
                .output
                .print_verbose(&format!("Request is not valid JSON: {err}"));
            relay.handle_json(Value::Null).await
        }
    };

    runtime
        .output
        .print_json(&json!({ "status": response.status, "body": response.body }))
}
