use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::StatusCode;

use gbridge_protocol::gemini::generate_content::types::Part;
use gbridge_protocol::openai::create_chat_completions::types::ChatCompletionContentPart;

use crate::error::TransformError;

/// Body and headers of a fetched remote image.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Outbound GET used to inline remote images. The error string is the
/// transport failure as reported by the client.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, String>;
}

/// Convert one OpenAI content part into one Gemini part.
pub async fn encode_part(
    part: ChatCompletionContentPart,
    fetcher: &dyn MediaFetcher,
) -> Result<Part, TransformError> {
    match part {
        ChatCompletionContentPart::Text { text } => Ok(Part::text(text)),
        ChatCompletionContentPart::ImageUrl { image_url } => {
            encode_image(&image_url.url, fetcher).await
        }
        ChatCompletionContentPart::InputAudio { input_audio } => Ok(Part::inline_data(
            format!("audio/{}", input_audio.format),
            input_audio.data,
        )),
        ChatCompletionContentPart::Unsupported => Err(TransformError::UnsupportedContentType),
    }
}

async fn encode_image(url: &str, fetcher: &dyn MediaFetcher) -> Result<Part, TransformError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return parse_data_uri(url);
    }

    let media = fetcher
        .fetch(url)
        .await
        .map_err(|err| TransformError::Fetch(format!("{err} ({url})")))?;
    if !media.status.is_success() {
        return Err(TransformError::Fetch(format!("{} ({url})", media.status)));
    }
    let mime_type = media
        .content_type
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| guess_mime_type(url));
    Ok(Part::inline_data(mime_type, STANDARD.encode(&media.body)))
}

fn guess_mime_type(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// `data:<mime>[;base64],<payload>`. The payload is passed through as is.
pub fn parse_data_uri(url: &str) -> Result<Part, TransformError> {
    let malformed = || TransformError::MalformedDataUri(truncate(url, 64));
    let rest = url.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    if header.contains(['\n', '\r']) || payload.contains(['\n', '\r']) {
        return Err(malformed());
    }
    let mime_type = header.strip_suffix(";base64").unwrap_or(header);
    Ok(Part::inline_data(mime_type, payload))
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &value[..end]),
        None => value.to_string(),
    }
}
