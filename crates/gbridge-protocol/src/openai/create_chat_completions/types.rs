use serde::{Deserialize, Serialize};

pub type JsonValue = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatCompletionStreamOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,
}

/// Roles the bridge distinguishes. Anything else (`developer`, `tool`, ...)
/// is read as `Other` and sent upstream as a user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatCompletionRole {
    System,
    User,
    Assistant,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatCompletionResponseRole {
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatCompletionImageUrl {
    /// Either an http(s) URL or a data URL (not enforced here).
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatCompletionInputAudio {
    /// Base64-encoded audio bytes (not enforced here).
    pub data: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatCompletionContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ChatCompletionImageUrl,
    },
    InputAudio {
        input_audio: ChatCompletionInputAudio,
    },
    /// Any other `type` tag; rejected during translation.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatCompletionMessageContent {
    Text(String),
    Parts(Vec<ChatCompletionContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatCompletionRequestMessage {
    pub role: ChatCompletionRole,
    /// Null for assistant turns that only carry tool calls.
    #[serde(default)]
    pub content: Option<ChatCompletionMessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopConfiguration {
    Single(String),
    Multiple(Vec<String>),
}

impl StopConfiguration {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StopConfiguration::Single(value) => vec![value],
            StopConfiguration::Multiple(values) => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponseFormatJsonSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Full JSON Schema is not modeled; the value is forwarded verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatCompletionResponseFormat {
    Text,
    JsonObject,
    JsonSchema {
        #[serde(default)]
        json_schema: ResponseFormatJsonSchema,
    },
    /// Any other `type` tag; rejected during translation.
    #[serde(other)]
    Unsupported,
}

/// Known OpenAI finish reasons; unknown upstream reasons pass through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChatCompletionFinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl From<String> for ChatCompletionFinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stop" => ChatCompletionFinishReason::Stop,
            "length" => ChatCompletionFinishReason::Length,
            "tool_calls" => ChatCompletionFinishReason::ToolCalls,
            "content_filter" => ChatCompletionFinishReason::ContentFilter,
            _ => ChatCompletionFinishReason::Other(value),
        }
    }
}

impl From<ChatCompletionFinishReason> for String {
    fn from(value: ChatCompletionFinishReason) -> Self {
        match value {
            ChatCompletionFinishReason::Stop => "stop".to_string(),
            ChatCompletionFinishReason::Length => "length".to_string(),
            ChatCompletionFinishReason::ToolCalls => "tool_calls".to_string(),
            ChatCompletionFinishReason::ContentFilter => "content_filter".to_string(),
            ChatCompletionFinishReason::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}
