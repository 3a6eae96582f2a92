use std::collections::BTreeMap;

use tracing::warn;

use gbridge_protocol::gemini::generate_content::response::GenerateContentResponse as GeminiGenerateContentResponse;
use gbridge_protocol::gemini::generate_content::types::{
    Candidate as GeminiCandidate, Content as GeminiContent, FinishReason as GeminiFinishReason,
    Part as GeminiPart, UsageMetadata as GeminiUsageMetadata,
};
use gbridge_protocol::openai::create_chat_completions::stream::{
    ChatCompletionChunkObjectType, ChatCompletionStreamChoice, ChatCompletionStreamResponseDelta,
    CreateChatCompletionStreamResponse,
};
use gbridge_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionResponseRole, CompletionUsage,
};

use crate::generate_content::openai_chat2gemini::response::{
    candidate_text, map_finish_reason, map_usage, now_epoch_seconds,
};

const ERROR_FINISH_REASON: &str = "error";

/// One outbound SSE event.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatStreamEvent {
    Chunk(CreateChatCompletionStreamResponse),
    /// `data: [DONE]`
    Done,
}

#[derive(Debug, Clone, Default)]
struct LastSeen {
    finish_reason: Option<GeminiFinishReason>,
    usage: Option<GeminiUsageMetadata>,
}

/// Per-request re-encoder from Gemini stream payloads to OpenAI chunks.
///
/// Each choice index gets a role-announcing delta the first time it shows
/// up, then one content delta per payload that carries text for it. The
/// closing delta for every index, and the terminal `[DONE]`, are only
/// produced by [`finish`](Self::finish).
#[derive(Debug)]
pub struct GeminiToOpenAIChatStreamState {
    id: String,
    model: String,
    created: i64,
    include_usage: bool,
    last_seen: BTreeMap<u32, LastSeen>,
    /// Most recent usage, including payloads that carried no candidate.
    latest_usage: Option<GeminiUsageMetadata>,
}

impl GeminiToOpenAIChatStreamState {
    pub fn new(id: String, model: String, include_usage: bool) -> Self {
        Self {
            id,
            model,
            created: now_epoch_seconds(),
            include_usage,
            last_seen: BTreeMap::new(),
            latest_usage: None,
        }
    }

    /// Decode one SSE `data` payload. A payload that is not a Gemini
    /// response turns into an `error` candidate for every known choice; the
    /// stream carries on.
    pub fn transform_payload(&mut self, payload: &str) -> Vec<ChatStreamEvent> {
        match serde_json::from_str::<GeminiGenerateContentResponse>(payload) {
            Ok(response) => self.transform_response(response),
            Err(err) => {
                warn!(
                    event = "stream_parse_error",
                    id = %self.id,
                    error = %err,
                    payload = %payload,
                    "invalid upstream stream payload"
                );
                let degraded = self.degraded_response(&err.to_string());
                self.transform_response(degraded)
            }
        }
    }

    pub fn transform_response(
        &mut self,
        response: GeminiGenerateContentResponse,
    ) -> Vec<ChatStreamEvent> {
        if response.usage_metadata.is_some() {
            self.latest_usage = response.usage_metadata;
        }

        let mut events = Vec::new();
        for candidate in response.candidates {
            let index = candidate.index.unwrap_or(0);
            if !self.last_seen.contains_key(&index) {
                events.push(self.chunk(
                    index,
                    ChatCompletionStreamResponseDelta {
                        role: Some(ChatCompletionResponseRole::Assistant),
                        content: Some(String::new()),
                    },
                    None,
                    None,
                ));
            }

            let text = candidate_text(&candidate);
            let seen = self.last_seen.entry(index).or_default();
            seen.finish_reason = candidate.finish_reason;
            if response.usage_metadata.is_some() {
                seen.usage = response.usage_metadata;
            }

            if let Some(content) = text {
                events.push(self.chunk(
                    index,
                    ChatCompletionStreamResponseDelta {
                        role: None,
                        content: Some(content),
                    },
                    None,
                    None,
                ));
            }
        }
        events
    }

    /// Close every choice in ascending index order, then `[DONE]`. A stream
    /// that never produced a choice closes with nothing.
    pub fn finish(self) -> Vec<ChatStreamEvent> {
        if self.last_seen.is_empty() {
            warn!(
                event = "stream_empty",
                id = %self.id,
                model = %self.model,
                "upstream stream produced no candidates"
            );
            return Vec::new();
        }

        let mut events: Vec<ChatStreamEvent> = self
            .last_seen
            .iter()
            .map(|(index, seen)| {
                let usage = if self.include_usage {
                    seen.usage.or(self.latest_usage).map(map_usage)
                } else {
                    None
                };
                self.chunk(
                    *index,
                    ChatCompletionStreamResponseDelta::default(),
                    seen.finish_reason.clone().map(map_finish_reason),
                    usage,
                )
            })
            .collect();
        events.push(ChatStreamEvent::Done);
        events
    }

    fn chunk(
        &self,
        index: u32,
        delta: ChatCompletionStreamResponseDelta,
        finish_reason: Option<ChatCompletionFinishReason>,
        usage: Option<CompletionUsage>,
    ) -> ChatStreamEvent {
        ChatStreamEvent::Chunk(CreateChatCompletionStreamResponse {
            id: self.id.clone(),
            object: ChatCompletionChunkObjectType::ChatCompletionChunk,
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChatCompletionStreamChoice {
                index,
                delta,
                finish_reason,
                logprobs: None,
            }],
            usage,
        })
    }

    fn degraded_response(&self, error: &str) -> GeminiGenerateContentResponse {
        let count = self
            .last_seen
            .keys()
            .next_back()
            .map_or(1, |last| last + 1);
        GeminiGenerateContentResponse {
            candidates: (0..count)
                .map(|index| GeminiCandidate {
                    index: Some(index),
                    content: Some(GeminiContent {
                        role: None,
                        parts: vec![GeminiPart::text(error)],
                    }),
                    finish_reason: Some(GeminiFinishReason::Other(ERROR_FINISH_REASON.to_string())),
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn state(include_usage: bool) -> GeminiToOpenAIChatStreamState {
        GeminiToOpenAIChatStreamState::new(
            "chatcmpl-test".to_string(),
            "gemini-1.5-pro-latest".to_string(),
            include_usage,
        )
    }

    /// `(index, delta, finish_reason)` per chunk, `None` for `[DONE]`.
    fn frames(events: &[ChatStreamEvent]) -> Vec<Option<(u32, Value, Value)>> {
        events
            .iter()
            .map(|event| match event {
                ChatStreamEvent::Chunk(chunk) => {
                    let choice = &chunk.choices[0];
                    Some((
                        choice.index,
                        serde_json::to_value(&choice.delta).unwrap(),
                        serde_json::to_value(&choice.finish_reason).unwrap(),
                    ))
                }
                ChatStreamEvent::Done => None,
            })
            .collect()
    }

    #[test]
    fn two_chunks_become_role_content_content_final_done() {
        let mut state = state(false);
        let mut events = state.transform_payload(
            r#"{"candidates":[{"content":{"parts":[{"text":"He"}],"role":"model"},"index":0}]}"#,
        );
        events.extend(state.transform_payload(
            r#"{"candidates":[{"content":{"parts":[{"text":"llo"}],"role":"model"},"finishReason":"STOP","index":0}]}"#,
        ));
        events.extend(state.finish());

        assert_eq!(
            frames(&events),
            vec![
                Some((0, json!({ "role": "assistant", "content": "" }), Value::Null)),
                Some((0, json!({ "content": "He" }), Value::Null)),
                Some((0, json!({ "content": "llo" }), Value::Null)),
                Some((0, json!({}), json!("stop"))),
                None,
            ]
        );

        let ChatStreamEvent::Chunk(first) = &events[0] else {
            panic!("expected chunk");
        };
        let value = serde_json::to_value(first).unwrap();
        assert_eq!(value["object"], json!("chat.completion.chunk"));
        assert_eq!(value["id"], json!("chatcmpl-test"));
        assert_eq!(value["choices"][0]["logprobs"], Value::Null);
        assert!(value.get("usage").is_none());
    }

    #[test]
    fn role_delta_always_precedes_content_per_index() {
        let mut state = state(false);
        let events = state.transform_payload(
            r#"{"candidates":[
                {"index":1,"content":{"parts":[{"text":"b"}]}},
                {"index":0,"content":{"parts":[{"text":"a"}]}}
            ]}"#,
        );
        let frames = frames(&events);
        for index in [0, 1] {
            let positions: Vec<_> = frames
                .iter()
                .enumerate()
                .filter(|(_, frame)| frame.as_ref().is_some_and(|f| f.0 == index))
                .map(|(pos, frame)| (pos, frame.clone().unwrap().1))
                .collect();
            assert_eq!(positions.len(), 2);
            assert_eq!(positions[0].1["role"], json!("assistant"));
            assert_eq!(positions[1].1.get("role"), None);
        }
    }

    #[test]
    fn finish_closes_each_index_once_in_order() {
        let mut state = state(false);
        state.transform_payload(r#"{"candidates":[{"index":2,"content":{"parts":[{"text":"x"}]}}]}"#);
        state.transform_payload(r#"{"candidates":[{"index":0,"finishReason":"MAX_TOKENS"}]}"#);
        state.transform_payload(r#"{"candidates":[{"index":2,"finishReason":"SAFETY"}]}"#);

        assert_eq!(
            frames(&state.finish()),
            vec![
                Some((0, json!({}), json!("length"))),
                Some((2, json!({}), json!("content_filter"))),
                None,
            ]
        );
    }

    #[test]
    fn nothing_seen_means_nothing_emitted() {
        let mut state = state(true);
        assert!(state.transform_payload(r#"{"candidates":[]}"#).is_empty());
        assert!(state.finish().is_empty());
    }

    #[test]
    fn usage_only_on_final_chunk_when_requested() {
        let payloads = [
            r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}],"usageMetadata":{"promptTokenCount":2,"candidatesTokenCount":1,"totalTokenCount":3}}"#,
            r#"{"candidates":[{"finishReason":"STOP"}]}"#,
        ];

        let mut with_usage = state(true);
        let mut events = Vec::new();
        for payload in payloads {
            events.extend(with_usage.transform_payload(payload));
        }
        events.extend(with_usage.finish());
        let usages: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ChatStreamEvent::Chunk(chunk) => Some(chunk.usage),
                ChatStreamEvent::Done => None,
            })
            .collect();
        assert!(usages[..usages.len() - 1].iter().all(Option::is_none));
        assert_eq!(
            usages.last().copied().flatten(),
            Some(CompletionUsage {
                prompt_tokens: 2,
                completion_tokens: 1,
                total_tokens: 3,
            })
        );

        let mut without_usage = state(false);
        for payload in payloads {
            without_usage.transform_payload(payload);
        }
        assert!(without_usage.finish().iter().all(|event| match event {
            ChatStreamEvent::Chunk(chunk) => chunk.usage.is_none(),
            ChatStreamEvent::Done => true,
        }));
    }

    #[test]
    fn trailing_usage_payload_without_candidates_is_kept() {
        let mut state = state(true);
        state.transform_payload(r#"{"candidates":[{"finishReason":"STOP","content":{"parts":[{"text":"a"}]}}]}"#);
        assert!(
            state
                .transform_payload(r#"{"usageMetadata":{"promptTokenCount":1,"candidatesTokenCount":1,"totalTokenCount":2}}"#)
                .is_empty()
        );
        let events = state.finish();
        let ChatStreamEvent::Chunk(last) = &events[0] else {
            panic!("expected chunk");
        };
        assert_eq!(last.usage.map(|usage| usage.total_tokens), Some(2));
    }

    #[test]
    fn malformed_payload_becomes_error_candidate() {
        let mut state = state(false);
        state.transform_payload(r#"{"candidates":[{"index":1,"content":{"parts":[{"text":"a"}]}}]}"#);
        let events = state.transform_payload("{not json");
        let frames = frames(&events);

        // Index 0 is new, index 1 was already announced.
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref().unwrap().0, 0);
        assert_eq!(frames[0].as_ref().unwrap().1["role"], json!("assistant"));
        assert!(!frames[1].as_ref().unwrap().1["content"].as_str().unwrap().is_empty());
        assert_eq!(frames[2].as_ref().unwrap().0, 1);

        assert_eq!(
            frames_finish(state),
            vec![(0, json!("error")), (1, json!("error"))]
        );
    }

    #[test]
    fn malformed_first_payload_yields_one_error_choice() {
        let mut state = state(false);
        let events = state.transform_payload("oops");
        assert_eq!(events.len(), 2);
        assert_eq!(frames_finish(state), vec![(0, json!("error"))]);
    }

    fn frames_finish(state: GeminiToOpenAIChatStreamState) -> Vec<(u32, Value)> {
        frames(&state.finish())
            .into_iter()
            .flatten()
            .map(|(index, _, reason)| (index, reason))
            .collect()
    }
}
