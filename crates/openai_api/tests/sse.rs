use openai_api::{ChatStreamEvent, ContentAccumulator, FinishReason, SseStreamParser, Usage};

fn frame(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

#[test]
fn sse_stream_reconstructs_answer_across_split_chunks() {
    let body = [
        frame(r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#),
        frame(r#"{"choices":[{"index":0,"delta":{"content":"4 and"},"finish_reason":null}]}"#),
        frame(r#"{"choices":[{"index":0,"delta":{"content":" 6"},"finish_reason":null}]}"#),
        frame(r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#),
        frame(r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#),
        frame("[DONE]"),
    ]
    .concat();

    let mut parser = SseStreamParser::default();
    let mut accumulator = ContentAccumulator::default();
    for chunk in body.as_bytes().chunks(7) {
        for event in parser.feed(chunk) {
            accumulator.apply(&event);
        }
    }

    assert_eq!(accumulator.content, "4 and 6");
    assert_eq!(accumulator.finish_reason, Some(FinishReason::Stop));
    assert_eq!(
        accumulator.usage,
        Some(Usage {
            prompt_tokens: 12,
            completion_tokens: 3,
            total_tokens: 15,
        })
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_error_object_maps_to_error_event() {
    let events = SseStreamParser::parse_frames(&frame(
        r#"{"error":{"message":"The server had an error","type":"server_error","code":null}}"#,
    ));
    assert_eq!(
        events,
        vec![ChatStreamEvent::Error {
            code: Some("server_error".to_owned()),
            message: Some("The server had an error".to_owned()),
        }]
    );
}

#[test]
fn sse_ignores_comments_and_malformed_json() {
    let input = concat!(
        ": keep-alive\n\n",
        "data: {not json}\n\n",
        "event: ping\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"}}]}\n\n",
    );
    assert_eq!(
        SseStreamParser::parse_frames(input),
        vec![ChatStreamEvent::ContentDelta {
            delta: "ok".to_owned(),
        }]
    );
}

#[test]
fn sse_null_usage_is_skipped() {
    let events = SseStreamParser::parse_frames(&frame(
        r#"{"choices":[{"index":0,"delta":{"content":"a"}}],"usage":null}"#,
    ));
    assert_eq!(events.len(), 1);
}

#[test]
fn sse_keeps_multibyte_text_split_across_reads() {
    let body = frame(r#"{"choices":[{"index":0,"delta":{"content":"こんにちは"}}]}"#);
    let bytes = body.as_bytes();
    let cut = body.find('こ').expect("greeting in frame") + 1;

    let mut parser = SseStreamParser::default();
    let mut events = parser.feed(&bytes[..cut]);
    assert!(events.is_empty());
    events.extend(parser.feed(&bytes[cut..]));

    assert_eq!(
        events,
        vec![ChatStreamEvent::ContentDelta {
            delta: "こんにちは".to_owned(),
        }]
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_crlf_split_between_reads_still_frames() {
    let mut parser = SseStreamParser::default();
    let mut events =
        parser.feed(b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"\xc3\xa9t\xc3\xa9\"}}]}\r\n\r");
    assert!(events.is_empty());
    events.extend(parser.feed(b"\n"));

    assert_eq!(
        events,
        vec![ChatStreamEvent::ContentDelta {
            delta: "été".to_owned(),
        }]
    );
}
