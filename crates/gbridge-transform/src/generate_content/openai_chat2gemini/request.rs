use gbridge_protocol::gemini::generate_content::request::{
    GenerateContentPath, GenerateContentRequest as GeminiGenerateContentRequest,
    GenerateContentRequestBody as GeminiGenerateContentRequestBody,
};
use gbridge_protocol::gemini::generate_content::types::{Content, ContentRole, Part};
use gbridge_protocol::openai::create_chat_completions::request::CreateChatCompletionRequest as OpenAIChatCompletionRequest;
use gbridge_protocol::openai::create_chat_completions::types::{
    ChatCompletionContentPart, ChatCompletionMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRole,
};

use crate::error::TransformError;
use crate::generate_content::openai_chat2gemini::config::{safety_settings, transform_config};
use crate::generate_content::openai_chat2gemini::content::{MediaFetcher, encode_part};
use crate::generate_content::openai_chat2gemini::model::resolve_model;

/// Convert an OpenAI chat-completions request into a Gemini generate-content request.
///
/// Fails before anything is sent upstream when a message part or the
/// response format cannot be expressed in Gemini terms.
pub async fn transform_request(
    request: OpenAIChatCompletionRequest,
    default_model: &str,
    fetcher: &dyn MediaFetcher,
) -> Result<GeminiGenerateContentRequest, TransformError> {
    let body = request.body;
    let generation_config = transform_config(&body)?;
    let model = resolve_model(body.model.as_deref(), default_model);
    let (system_instruction, contents) = transform_messages(body.messages, fetcher).await?;

    Ok(GeminiGenerateContentRequest {
        path: GenerateContentPath { model },
        body: GeminiGenerateContentRequestBody {
            system_instruction,
            contents,
            generation_config,
            safety_settings: safety_settings(),
        },
    })
}

/// Split chat messages into an optional system instruction and the turn list.
pub async fn transform_messages(
    messages: Vec<ChatCompletionRequestMessage>,
    fetcher: &dyn MediaFetcher,
) -> Result<(Option<Content>, Vec<Content>), TransformError> {
    let mut system_instruction: Option<Content> = None;
    let mut contents = Vec::new();

    for message in messages {
        let parts = transform_message_content(message.content, fetcher).await?;
        match message.role {
            // Several system messages accumulate into one instruction.
            ChatCompletionRole::System => match system_instruction.as_mut() {
                Some(instruction) => instruction.parts.extend(parts),
                None => {
                    system_instruction = Some(Content { role: None, parts });
                }
            },
            ChatCompletionRole::Assistant => contents.push(Content::new(ContentRole::Model, parts)),
            ChatCompletionRole::User | ChatCompletionRole::Other => {
                contents.push(Content::new(ContentRole::User, parts))
            }
        }
    }

    // Gemini rejects a system instruction without any turn.
    if system_instruction.is_some() && contents.is_empty() {
        contents.push(Content::new(ContentRole::Model, vec![Part::text(" ")]));
    }

    Ok((system_instruction, contents))
}

async fn transform_message_content(
    content: Option<ChatCompletionMessageContent>,
    fetcher: &dyn MediaFetcher,
) -> Result<Vec<Part>, TransformError> {
    let items = match content {
        None => return Ok(vec![Part::text("")]),
        Some(ChatCompletionMessageContent::Text(text)) => return Ok(vec![Part::text(text)]),
        Some(ChatCompletionMessageContent::Parts(items)) => items,
    };

    let image_only = items
        .iter()
        .all(|item| matches!(item, ChatCompletionContentPart::ImageUrl { .. }));

    let mut parts = Vec::with_capacity(items.len() + 1);
    for item in items {
        parts.push(encode_part(item, fetcher).await?);
    }
    if image_only {
        // Turns without any text part are rejected upstream; an empty list counts.
        parts.push(Part::text(""));
    }
    Ok(parts)
}
