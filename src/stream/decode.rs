use crate::api::ChatResponse;
use crate::stream::sse::DONE_SENTINEL;

/// How a raw chunk is turned into text for the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadDecoder {
    /// The chunk is already display text.
    #[default]
    Text,
    /// The chunk is the `data` payload of an OpenAI-compatible SSE event.
    ChatDelta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text(String),
    /// Valid payload that carries no text (role headers, finish markers).
    Skip,
    Done,
    /// The payload is an error body, formatted for display.
    Error(String),
}

impl PayloadDecoder {
    pub fn decode(self, raw: &str) -> Decoded {
        match self {
            PayloadDecoder::Text => Decoded::Text(raw.to_string()),
            PayloadDecoder::ChatDelta => decode_chat_delta(raw),
        }
    }
}

fn decode_chat_delta(payload: &str) -> Decoded {
    if payload.trim() == DONE_SENTINEL {
        return Decoded::Done;
    }
    if payload.trim().is_empty() {
        return Decoded::Skip;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => match response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
        {
            Some(content) if !content.is_empty() => Decoded::Text(content),
            _ => Decoded::Skip,
        },
        Err(_) => Decoded::Error(format_api_error(payload)),
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Wrap an error body in a fenced block so it renders verbatim, leading with
/// the human-readable message when the body is JSON that carries one.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {summary}\n```json\n{pretty_json}\n```");
                }
            }
            return format!("API Error:\n```json\n{pretty_json}\n```");
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{trimmed}\n```")
    } else {
        format!("API Error:\n```\n{trimmed}\n```")
    }
}
