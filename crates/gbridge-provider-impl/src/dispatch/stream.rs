use bytes::Bytes;
use http::HeaderMap;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};
use serde::Serialize;

use gbridge_protocol::sse::SseDecoder;
use gbridge_transform::generate_content::openai_chat2gemini::{
    ChatStreamEvent, GeminiToOpenAIChatStreamState,
};

const DONE_EVENT: &[u8] = b"data: [DONE]\n\n";

/// Upstream SSE bytes in, OpenAI chunk frames out. One per streamed request.
#[derive(Debug)]
pub struct ChatStreamPipeline {
    decoder: SseDecoder,
    state: GeminiToOpenAIChatStreamState,
}

impl ChatStreamPipeline {
    pub fn new(state: GeminiToOpenAIChatStreamState) -> Self {
        Self {
            decoder: SseDecoder::new(),
            state,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut out = Vec::new();
        for data in self.decoder.push(chunk) {
            if is_forwardable(&data) {
                out.extend(encode_events(self.state.transform_payload(&data)));
            }
        }
        out
    }

    /// Flush the decoder residual, then close every choice.
    pub fn finish(self) -> Vec<Bytes> {
        let Self { decoder, mut state } = self;
        let mut out = Vec::new();
        for data in decoder.finish() {
            if is_forwardable(&data) {
                out.extend(encode_events(state.transform_payload(&data)));
            }
        }
        out.extend(encode_events(state.finish()));
        out
    }
}

fn is_forwardable(data: &str) -> bool {
    let data = data.trim();
    !data.is_empty() && data != "[DONE]"
}

fn encode_events(events: Vec<ChatStreamEvent>) -> impl Iterator<Item = Bytes> {
    events.into_iter().filter_map(|event| match event {
        ChatStreamEvent::Chunk(chunk) => sse_json_bytes(&chunk),
        ChatStreamEvent::Done => Some(Bytes::from_static(DONE_EVENT)),
    })
}

fn sse_json_bytes<T: Serialize>(value: &T) -> Option<Bytes> {
    let payload = serde_json::to_vec(value).ok()?;
    let mut data = Vec::with_capacity(payload.len() + 8);
    data.extend_from_slice(b"data: ");
    data.extend_from_slice(&payload);
    data.extend_from_slice(b"\n\n");
    Some(Bytes::from(data))
}

/// The body is re-encoded, so framing headers from upstream no longer apply.
pub(super) fn scrub_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONTENT_ENCODING);
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSTREAM: &str = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"He\"}],\"role\":\"model\"},\"index\":0}]}\r\n\r\n\
data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"llo\"}],\"role\":\"model\"},\"finishReason\":\"STOP\",\"index\":0}],\"usageMetadata\":{\"promptTokenCount\":1,\"candidatesTokenCount\":2,\"totalTokenCount\":3}}\r\n\r\n";

    fn run(input: &[u8], fragment: usize) -> Vec<String> {
        let mut pipeline = ChatStreamPipeline::new(GeminiToOpenAIChatStreamState::new(
            "chatcmpl-fixed".to_string(),
            "gemini-1.5-pro-latest".to_string(),
            false,
        ));
        let mut frames = Vec::new();
        for piece in input.chunks(fragment) {
            frames.extend(pipeline.push(piece));
        }
        frames.extend(pipeline.finish());
        frames
            .into_iter()
            .map(|frame| String::from_utf8(frame.to_vec()).unwrap())
            .collect()
    }

    /// `created` differs between runs, so compare everything else.
    fn without_created(frames: Vec<String>) -> Vec<serde_json::Value> {
        frames
            .iter()
            .map(|frame| {
                let data = frame
                    .strip_prefix("data: ")
                    .and_then(|rest| rest.strip_suffix("\n\n"))
                    .unwrap();
                if data == "[DONE]" {
                    return serde_json::Value::String(data.to_string());
                }
                let mut value: serde_json::Value = serde_json::from_str(data).unwrap();
                value.as_object_mut().unwrap().remove("created");
                value
            })
            .collect()
    }

    #[test]
    fn frames_are_sse_encoded_and_terminated() {
        let frames = run(UPSTREAM.as_bytes(), UPSTREAM.len());
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|frame| frame.starts_with("data: ") && frame.ends_with("\n\n")));
        assert_eq!(frames[4], "data: [DONE]\n\n");
        assert!(frames[1].contains("\"content\":\"He\""));
        assert!(frames[3].contains("\"finish_reason\":\"stop\""));
        assert!(!frames[3].contains("usage"));
    }

    #[test]
    fn output_does_not_depend_on_fragmenting() {
        let whole = without_created(run(UPSTREAM.as_bytes(), UPSTREAM.len()));
        for size in [1, 5, 13, 100] {
            assert_eq!(without_created(run(UPSTREAM.as_bytes(), size)), whole, "size {size}");
        }
    }

    #[test]
    fn upstream_done_marker_is_ignored() {
        let frames = run(b"data: [DONE]\n\n", 64);
        assert!(frames.is_empty());
    }

    #[test]
    fn unterminated_last_event_still_counts() {
        let input = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"x\"}]},\"finishReason\":\"STOP\"}]}";
        let frames = run(input.as_bytes(), 7);
        assert_eq!(frames.len(), 4);
        assert!(frames[1].contains("\"content\":\"x\""));
        assert_eq!(frames[3], "data: [DONE]\n\n");
    }

    #[test]
    fn truncated_bare_data_line_reaches_the_encoder() {
        let frames = run(b"data", 2);
        assert_eq!(frames.len(), 4);
        assert!(frames[2].contains("\"finish_reason\":\"error\""));
        assert_eq!(frames[3], "data: [DONE]\n\n");
    }

    #[test]
    fn scrub_removes_framing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "10".parse().unwrap());
        headers.insert(CONTENT_ENCODING, "gzip".parse().unwrap());
        headers.insert("x-request-id", "abc".parse().unwrap());
        scrub_headers(&mut headers);
        assert_eq!(headers.len(), 1);
    }
}
