pub mod provider;
pub mod request;
pub mod response;

pub use provider::{CallContext, Provider};
pub use request::ProxyRequest;
pub use response::{ProxyResponse, StreamBody, UpstreamPassthroughError};
