use crate::gemini::generate_content::request::{GenerateContentPath, GenerateContentRequestBody};

/// `models/{model}:streamGenerateContent?alt=sse`. The body is identical to the unary call.
#[derive(Debug, Clone)]
pub struct StreamGenerateContentRequest {
    pub path: GenerateContentPath,
    pub body: GenerateContentRequestBody,
}
