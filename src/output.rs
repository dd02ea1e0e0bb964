//! Terminal output. Rendered fragments go to stdout, diagnostics to stderr.
//!
//! With `--json` each result is one JSON object on stdout. `--quiet` silences
//! diagnostics and confirmations but never the fragment itself.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::errors::CliError;
use crate::session::types::TranscriptItem;

#[derive(Debug, Clone)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub debug: bool,
}

impl OutputMode {
    /// Print a fragment as-is, or in JSON mode as the `html` field merged into `meta`.
    pub fn print_fragment(&self, fragment: &str, meta: Value) -> Result<(), CliError> {
        self.write_fragment(&mut io::stdout().lock(), fragment, meta)
    }

    /// A transcript item together with the session state shown beside it.
    pub fn print_item(
        &self,
        item: &TranscriptItem,
        status_line: &str,
        model: Option<&str>,
    ) -> Result<(), CliError> {
        let meta = json!({
            "kind": item.kind.as_str(),
            "status": status_line,
            "model": model,
        });
        self.print_fragment(&item.html, meta)?;
        self.print_diagnostic(status_line);
        Ok(())
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<(), CliError> {
        write_json(&mut io::stdout().lock(), value)
    }

    pub fn print_human(&self, message: &str) {
        if self.json || self.quiet {
            return;
        }
        println!("{message}");
    }

    /// Status lines, notices and prompts.
    pub fn print_diagnostic(&self, message: &str) {
        if self.json || self.quiet || message.is_empty() {
            return;
        }
        eprintln!("{message}");
    }

    pub fn print_verbose(&self, message: &str) {
        if self.verbose {
            self.print_diagnostic(message);
        }
    }

    pub fn print_error(&self, error: &CliError) {
        if !self.json {
            eprintln!("Error: {error}");
            return;
        }
        if self.print_json(&error_envelope(error)).is_err() {
            println!("{{\"error\":\"unknown\"}}");
        }
    }

    fn write_fragment<W: Write>(
        &self,
        out: &mut W,
        fragment: &str,
        meta: Value,
    ) -> Result<(), CliError> {
        if self.json {
            return write_json(out, &with_fragment(meta, fragment));
        }
        if !fragment.is_empty() {
            writeln!(out, "{fragment}")?;
        }
        Ok(())
    }
}

/// `{error, status, code}` for a failed command.
pub fn error_envelope(error: &CliError) -> Value {
    json!({
        "error": error.to_string(),
        "status": error.status(),
        "code": error.exit_code(),
    })
}

fn with_fragment(meta: Value, fragment: &str) -> Value {
    let mut object = match meta {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("meta".to_string(), other);
            map
        }
    };
    object.insert("html".to_string(), Value::String(fragment.to_string()));
    Value::Object(object)
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(json: bool, quiet: bool) -> OutputMode {
        OutputMode {
            json,
            quiet,
            verbose: false,
            debug: false,
        }
    }

    fn written(mode: &OutputMode, fragment: &str, meta: Value) -> String {
        let mut out = Vec::new();
        mode.write_fragment(&mut out, fragment, meta).expect("write");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn human_mode_prints_fragment_only() {
        let text = written(&mode(false, false), "<p>hi</p>", json!({ "model": "m" }));
        assert_eq!(text, "<p>hi</p>\n");
        assert_eq!(written(&mode(false, false), "", Value::Null), "");
    }

    #[test]
    fn quiet_mode_still_prints_fragment() {
        assert_eq!(written(&mode(false, true), "<hr>", Value::Null), "<hr>\n");
    }

    #[test]
    fn json_mode_merges_fragment_into_meta() {
        let text = written(&mode(true, false), "<p>a</p>", json!({ "truncated": false }));
        let value: Value = serde_json::from_str(text.trim_end()).expect("json");
        assert_eq!(value, json!({ "truncated": false, "html": "<p>a</p>" }));

        let text = written(&mode(true, false), "", json!("extra"));
        let value: Value = serde_json::from_str(text.trim_end()).expect("json");
        assert_eq!(value, json!({ "meta": "extra", "html": "" }));
    }

    #[test]
    fn error_envelope_carries_status_and_exit_code() {
        let err = CliError::Config("Service is not configured.".into());
        assert_eq!(
            error_envelope(&err),
            json!({ "error": "Service is not configured.", "status": 503, "code": 7 })
        );
    }
}
