use rand::Rng;
use rand::distr::Alphanumeric;
use time::OffsetDateTime;

use gbridge_protocol::gemini::generate_content::response::GenerateContentResponse as GeminiGenerateContentResponse;
use gbridge_protocol::gemini::generate_content::types::{
    Candidate as GeminiCandidate, Content as GeminiContent, FinishReason as GeminiFinishReason,
    UsageMetadata as GeminiUsageMetadata,
};
use gbridge_protocol::openai::create_chat_completions::response::{
    ChatCompletionChoice, ChatCompletionObjectType, ChatCompletionResponseMessage,
    CreateChatCompletionResponse as OpenAIChatCompletionResponse,
};
use gbridge_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionResponseRole, CompletionUsage,
};

/// Joins the text parts of one candidate.
pub const PART_SEPARATOR: &str = "\n\n|>";

const ID_PREFIX: &str = "chatcmpl-";
const ID_RANDOM_LEN: usize = 29;

/// Convert a Gemini generate-content response into an OpenAI chat completion.
pub fn transform_response(
    response: GeminiGenerateContentResponse,
    model: &str,
    id: String,
) -> OpenAIChatCompletionResponse {
    let choices = response
        .candidates
        .into_iter()
        .map(|candidate| ChatCompletionChoice {
            index: candidate.index.unwrap_or(0),
            message: ChatCompletionResponseMessage {
                role: ChatCompletionResponseRole::Assistant,
                content: candidate.content.as_ref().map(join_text),
            },
            finish_reason: candidate.finish_reason.map(map_finish_reason),
            logprobs: None,
        })
        .collect();

    OpenAIChatCompletionResponse {
        id,
        object: ChatCompletionObjectType::ChatCompletion,
        created: now_epoch_seconds(),
        model: model.to_string(),
        choices,
        usage: response.usage_metadata.map(map_usage),
    }
}

pub fn map_finish_reason(reason: GeminiFinishReason) -> ChatCompletionFinishReason {
    match reason {
        GeminiFinishReason::Stop => ChatCompletionFinishReason::Stop,
        GeminiFinishReason::MaxTokens => ChatCompletionFinishReason::Length,
        GeminiFinishReason::Safety | GeminiFinishReason::Recitation => {
            ChatCompletionFinishReason::ContentFilter
        }
        GeminiFinishReason::Other(value) => ChatCompletionFinishReason::from(value),
    }
}

pub fn map_usage(usage: GeminiUsageMetadata) -> CompletionUsage {
    CompletionUsage {
        prompt_tokens: i64::from(usage.prompt_token_count.unwrap_or(0)),
        completion_tokens: i64::from(usage.candidates_token_count.unwrap_or(0)),
        total_tokens: i64::from(usage.total_token_count.unwrap_or(0)),
    }
}

/// Text parts only; inline data and other kinds are skipped.
pub fn join_text(content: &GeminiContent) -> String {
    content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join(PART_SEPARATOR)
}

pub(crate) fn candidate_text(candidate: &GeminiCandidate) -> Option<String> {
    candidate.content.as_ref().map(join_text)
}

/// `chatcmpl-` followed by 29 random alphanumerics.
pub fn generate_chat_completion_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

pub fn now_epoch_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
