use gbridge_protocol::openai::create_chat_completions::request::CreateChatCompletionRequest;
use gbridge_provider_core::ProxyRequest;

pub enum DispatchPlan {
    /// The provider speaks the request's protocol; forward it untouched.
    Native(ProxyRequest),
    Transform(TransformPlan),
}

pub enum TransformPlan {
    /// OpenAI chat -> Gemini generateContent
    OpenAIChat2Gemini(CreateChatCompletionRequest),
    /// OpenAI chat stream -> Gemini streamGenerateContent
    OpenAIChatStream2Gemini(CreateChatCompletionRequest),
}
