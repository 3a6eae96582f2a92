//! OpenAI chat completions on top of Gemini `generateContent`.

pub mod config;
pub mod content;
pub mod model;
pub mod request;
pub mod response;
pub mod stream;

pub use content::{FetchedMedia, MediaFetcher};
pub use model::{resolve_model, DEFAULT_MODEL};
pub use stream::{ChatStreamEvent, GeminiToOpenAIChatStreamState};
