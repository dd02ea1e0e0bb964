// Reply extraction from upstream generateContent payloads.

use serde_json::Value;

/// Text of the first candidate that yields any non-empty content, in upstream order.
pub fn extract_reply(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .as_array()?
        .iter()
        .find_map(candidate_text)
}

fn candidate_text(candidate: &Value) -> Option<String> {
    let parts = candidate.get("content")?.get("parts")?.as_array()?;
    let segments: Vec<String> = parts
        .iter()
        .filter_map(part_text)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("\n"))
}

fn part_text(part: &Value) -> Option<String> {
    if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
        return Some(text.to_string());
    }

    if let Some(call) = part.get("functionCall") {
        let name = call.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
        let args = call
            .get("args")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "{}".to_string());
        return Some(format!("[function call: {name}({args})]"));
    }

    if let Some(code) = part.get("executableCode") {
        let language = code
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let language = if language == "language_unspecified" { String::new() } else { language };
        let source = code.get("code").and_then(|v| v.as_str()).unwrap_or("");
        if source.trim().is_empty() {
            return None;
        }
        return Some(format!("```{language}\n{source}\n```"));
    }

    if let Some(result) = part.get("codeExecutionResult") {
        let output = result.get("output").and_then(|v| v.as_str()).unwrap_or("");
        if output.trim().is_empty() {
            return None;
        }
        return Some(format!("```output\n{}\n```", output.trim_end()));
    }

    if let Some(data) = part.get("inlineData") {
        let mime = data
            .get("mimeType")
            .and_then(|v| v.as_str())
            .unwrap_or("application/octet-stream");
        let bytes = data
            .get("data")
            .and_then(|v| v.as_str())
            .map(base64_decoded_len)
            .unwrap_or(0);
        return Some(format!("[inline data: {mime}, {bytes} bytes]"));
    }

    if let Some(file) = part.get("fileData") {
        let uri = file.get("fileUri").and_then(|v| v.as_str()).unwrap_or("unknown");
        let mime = file
            .get("mimeType")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown type");
        return Some(format!("[file: {uri} ({mime})]"));
    }

    None
}

fn base64_decoded_len(encoded: &str) -> usize {
    let payload = encoded.trim().trim_end_matches('=');
    payload.len() * 3 / 4
}

/// Best available reason for a payload that carried no text.
pub fn no_text_detail(payload: &Value) -> String {
    let finish_reason = payload
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|candidates| {
            candidates
                .iter()
                .find_map(|c| c.get("finishReason").and_then(|v| v.as_str()))
        });
    if let Some(reason) = finish_reason {
        return format!("finishReason: {reason}");
    }

    if let Some(reason) = payload
        .get("promptFeedback")
        .and_then(|v| v.get("blockReason"))
        .and_then(|v| v.as_str())
    {
        return format!("blockReason: {reason}");
    }

    "The model returned no text.".to_string()
}

/// Extract usage statistics and format as a display string
pub fn extract_usage_line(payload: &Value) -> String {
    if let Some(usage) = payload.get("usageMetadata") {
        let input = usage
            .get("promptTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let output = usage
            .get("candidatesTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let total = usage
            .get("totalTokenCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(input + output);
        return format!("usage(input={input}, output={output}, total={total})");
    }
    "usage(unknown)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Hello" }, { "text": "world" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(extract_reply(&payload).as_deref(), Some("Hello\nworld"));
    }

    #[test]
    fn first_non_empty_candidate_wins() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "   " }] }, "finishReason": "SAFETY" },
                { "finishReason": "RECITATION" },
                { "content": { "parts": [{ "text": "second" }] } }
            ]
        });
        assert_eq!(extract_reply(&payload).as_deref(), Some("second"));
    }

    #[test]
    fn non_text_segments_are_described() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [
                    { "functionCall": { "name": "lookup", "args": { "q": "rust" } } },
                    { "executableCode": { "language": "PYTHON", "code": "print(1)" } },
                    { "codeExecutionResult": { "outcome": "OUTCOME_OK", "output": "1\n" } },
                    { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                    { "fileData": { "mimeType": "application/pdf", "fileUri": "gs://b/doc.pdf" } }
                ]}
            }]
        });
        let reply = extract_reply(&payload).unwrap_or_default();
        assert_eq!(
            reply,
            "[function call: lookup({\"q\":\"rust\"})]\n```python\nprint(1)\n```\n```output\n1\n```\n[inline data: image/png, 3 bytes]\n[file: gs://b/doc.pdf (application/pdf)]"
        );
    }

    #[test]
    fn decoded_size_accounts_for_padding() {
        assert_eq!(base64_decoded_len("AAAA"), 3);
        assert_eq!(base64_decoded_len("AAA="), 2);
        assert_eq!(base64_decoded_len("AA=="), 1);
        assert_eq!(base64_decoded_len(""), 0);
    }

    #[test]
    fn missing_text_reports_termination_reason() {
        let payload = json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] });
        assert_eq!(extract_reply(&payload), None);
        assert_eq!(no_text_detail(&payload), "finishReason: MAX_TOKENS");

        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(extract_reply(&blocked), None);
        assert_eq!(no_text_detail(&blocked), "blockReason: SAFETY");

        assert_eq!(no_text_detail(&json!({})), "The model returned no text.");
    }

    #[test]
    fn usage_line_reads_usage_metadata() {
        let payload = json!({
            "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 6, "totalTokenCount": 10 }
        });
        assert_eq!(
            extract_usage_line(&payload),
            "usage(input=4, output=6, total=10)"
        );
        assert_eq!(extract_usage_line(&json!({})), "usage(unknown)");
    }
}
