use gbridge_protocol::gemini;
use gbridge_protocol::openai;

#[derive(Debug, Clone)]
pub enum ProxyRequest {
    GeminiGenerate(gemini::generate_content::request::GenerateContentRequest),
    GeminiGenerateStream(gemini::stream_content::request::StreamGenerateContentRequest),

    OpenAIChat(openai::create_chat_completions::request::CreateChatCompletionRequest),
    OpenAIChatStream(openai::create_chat_completions::request::CreateChatCompletionRequest),
}

impl ProxyRequest {
    /// Route an inbound chat request by its `stream` flag.
    pub fn openai_chat(
        request: openai::create_chat_completions::request::CreateChatCompletionRequest,
    ) -> Self {
        if request.body.is_stream() {
            ProxyRequest::OpenAIChatStream(request)
        } else {
            ProxyRequest::OpenAIChat(request)
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(
            self,
            ProxyRequest::GeminiGenerateStream(_) | ProxyRequest::OpenAIChatStream(_)
        )
    }
}
