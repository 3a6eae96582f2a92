use gbridge_protocol::gemini::generate_content::types::{
    GenerationConfig, HarmBlockThreshold, HarmCategory, SafetySetting,
};
use gbridge_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use gbridge_protocol::openai::create_chat_completions::types::ChatCompletionResponseFormat;

use crate::error::TransformError;

const HARM_CATEGORIES: [HarmCategory; 5] = [
    HarmCategory::HateSpeech,
    HarmCategory::SexuallyExplicit,
    HarmCategory::DangerousContent,
    HarmCategory::Harassment,
    HarmCategory::CivicIntegrity,
];

/// Blocking disabled for every category, whatever the request says.
pub fn safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category: *category,
            threshold: HarmBlockThreshold::BlockNone,
        })
        .collect()
}

/// Map OpenAI sampling, stop and output-format fields onto `generationConfig`.
pub fn transform_config(
    body: &CreateChatCompletionRequestBody,
) -> Result<GenerationConfig, TransformError> {
    let mut config = GenerationConfig {
        stop_sequences: body.stop.clone().map(|stop| stop.into_vec()),
        candidate_count: body.n,
        // max_completion_tokens supersedes the deprecated max_tokens.
        max_output_tokens: body.max_completion_tokens.or(body.max_tokens),
        temperature: body.temperature,
        top_p: body.top_p,
        top_k: body.top_k,
        frequency_penalty: body.frequency_penalty,
        presence_penalty: body.presence_penalty,
        ..Default::default()
    };

    match &body.response_format {
        None => {}
        Some(ChatCompletionResponseFormat::Text) => {
            config.response_mime_type = Some("text/plain".to_string());
        }
        Some(ChatCompletionResponseFormat::JsonObject) => {
            config.response_mime_type = Some("application/json".to_string());
        }
        Some(ChatCompletionResponseFormat::JsonSchema { json_schema }) => {
            let schema = json_schema.schema.clone();
            let is_enum = schema
                .as_ref()
                .and_then(|schema| schema.as_object())
                .is_some_and(|schema| schema.contains_key("enum"));
            config.response_mime_type = Some(if is_enum {
                "text/x.enum".to_string()
            } else {
                "application/json".to_string()
            });
            config.response_schema = schema;
        }
        Some(ChatCompletionResponseFormat::Unsupported) => {
            return Err(TransformError::UnsupportedResponseFormat);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: serde_json::Value) -> CreateChatCompletionRequestBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn maps_sampling_fields_and_drops_unknown_ones() {
        let config = transform_config(&body(json!({
            "model": "gpt-4",
            "messages": [],
            "stop": "END",
            "n": 2,
            "max_tokens": 100,
            "temperature": 0.5,
            "top_p": 0.9,
            "top_k": 40,
            "frequency_penalty": 0.1,
            "presence_penalty": 0.2,
            "logit_bias": { "50256": -100 },
            "seed": 7
        })))
        .unwrap();

        assert_eq!(
            serde_json::to_value(config).unwrap(),
            json!({
                "stopSequences": ["END"],
                "candidateCount": 2,
                "maxOutputTokens": 100,
                "temperature": 0.5,
                "topP": 0.9,
                "topK": 40,
                "frequencyPenalty": 0.1,
                "presencePenalty": 0.2
            })
        );
    }

    #[test]
    fn max_completion_tokens_wins() {
        let config = transform_config(&body(json!({
            "messages": [],
            "max_tokens": 10,
            "max_completion_tokens": 20
        })))
        .unwrap();
        assert_eq!(config.max_output_tokens, Some(20));
    }

    #[test]
    fn response_format_mime_types() {
        let text = transform_config(&body(json!({ "response_format": { "type": "text" } })))
            .unwrap();
        assert_eq!(text.response_mime_type.as_deref(), Some("text/plain"));

        let json_object =
            transform_config(&body(json!({ "response_format": { "type": "json_object" } })))
                .unwrap();
        assert_eq!(json_object.response_mime_type.as_deref(), Some("application/json"));

        let schema = transform_config(&body(json!({
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "person", "schema": { "type": "object" } }
            }
        })))
        .unwrap();
        assert_eq!(schema.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(schema.response_schema, Some(json!({ "type": "object" })));
    }

    #[test]
    fn enum_schema_uses_enum_mime_type() {
        let config = transform_config(&body(json!({
            "response_format": {
                "type": "json_schema",
                "json_schema": { "schema": { "enum": ["A", "B"] } }
            }
        })))
        .unwrap();
        let value = serde_json::to_value(config).unwrap();
        assert_eq!(value["responseSchema"], json!({ "enum": ["A", "B"] }));
        assert_eq!(value["responseMimeType"], json!("text/x.enum"));
    }

    #[test]
    fn unknown_response_format_is_rejected() {
        let err = transform_config(&body(json!({ "response_format": { "type": "xml" } })))
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedResponseFormat));
    }

    #[test]
    fn safety_block_covers_every_category() {
        let settings = safety_settings();
        assert_eq!(settings.len(), 5);
        assert!(settings
            .iter()
            .all(|setting| setting.threshold == HarmBlockThreshold::BlockNone));
        assert_eq!(
            serde_json::to_value(&settings[0]).unwrap(),
            json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" })
        );
    }
}
