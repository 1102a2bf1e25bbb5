use serde_json::Value;

use crate::events::{ChatStreamEvent, FinishReason, Usage};

/// Incremental parser for chat-completions SSE streams.
///
/// One SSE frame may carry several normalized events, e.g. a final delta and
/// its finish reason. Bytes are buffered until a frame is complete, so a
/// character split across network reads is decoded whole.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChatStreamEvent> {
        self.buffer.extend_from_slice(bytes);
        if self.buffer.contains(&b'\r') {
            self.buffer = strip_carriage_returns(&self.buffer);
        }
        let mut events = Vec::new();

        while let Some(split) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..split + 2).collect();
            let frame = String::from_utf8_lossy(&frame[..split]);

            let Some(payload) = extract_data_payload(&frame) else {
                continue;
            };
            if payload == "[DONE]" {
                continue;
            }

            if let Ok(value) = serde_json::from_str::<Value>(&payload) {
                map_chunk(&value, &mut events);
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<ChatStreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\n\n")
}

/// Drops every `\r` that precedes `\n`; a trailing `\r` waits for the next read.
fn strip_carriage_returns(buffer: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    for (index, byte) in buffer.iter().enumerate() {
        if *byte == b'\r' && buffer.get(index + 1) == Some(&b'\n') {
            continue;
        }
        out.push(*byte);
    }
    out
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_chunk(value: &Value, events: &mut Vec<ChatStreamEvent>) {
    if let Some(error) = value.get("error") {
        let code = error
            .get("code")
            .and_then(|value| value.as_str())
            .or_else(|| error.get("type").and_then(|value| value.as_str()))
            .map(ToString::to_string);
        let message = error
            .get("message")
            .and_then(|value| value.as_str())
            .map(ToString::to_string);
        events.push(ChatStreamEvent::Error { code, message });
        return;
    }

    // Only the first choice is rendered; `n` is never set above 1.
    let choice = value
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|choices| {
            choices
                .iter()
                .find(|choice| choice.get("index").and_then(Value::as_u64).unwrap_or(0) == 0)
        });

    if let Some(choice) = choice {
        if let Some(delta) = choice
            .get("delta")
            .and_then(|delta| delta.get("content"))
            .and_then(|content| content.as_str())
        {
            events.push(ChatStreamEvent::ContentDelta {
                delta: delta.to_owned(),
            });
        }
        if let Some(reason) = choice.get("finish_reason").and_then(|value| value.as_str()) {
            events.push(ChatStreamEvent::Finished {
                reason: FinishReason::parse(reason),
            });
        }
    }

    if let Some(usage) = value
        .get("usage")
        .filter(|usage| !usage.is_null())
        .and_then(|usage| serde_json::from_value::<Usage>(usage.clone()).ok())
    {
        events.push(ChatStreamEvent::Usage { usage });
    }
}
