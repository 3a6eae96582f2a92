use thiserror::Error;

/// Request translation failures. All of them are the caller's fault and are
/// raised before anything is sent upstream.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unsupported content part type")]
    UnsupportedContentType,
    #[error("invalid image data: {0}")]
    MalformedDataUri(String),
    #[error("error fetching image: {0}")]
    Fetch(String),
    #[error("unsupported response_format.type")]
    UnsupportedResponseFormat,
}
