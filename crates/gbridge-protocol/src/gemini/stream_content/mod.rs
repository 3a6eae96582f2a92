pub mod request;

pub use request::StreamGenerateContentRequest;
