pub mod types;
pub mod request;
pub mod response;
pub mod stream;

pub use request::{CreateChatCompletionRequest, CreateChatCompletionRequestBody};
pub use response::CreateChatCompletionResponse;
pub use stream::CreateChatCompletionStreamResponse;
pub use types::*;
