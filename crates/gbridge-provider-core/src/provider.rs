use async_trait::async_trait;

use crate::request::ProxyRequest;
use crate::response::{ProxyResponse, UpstreamPassthroughError};

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Correlates the log lines of one inbound request.
    pub trace_id: String,
    pub request_id: Option<String>,
    /// Gemini API key for this call; taken from the inbound bearer token or
    /// the configured fallback.
    pub api_key: String,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn call(
        &self,
        req: ProxyRequest,
        ctx: CallContext,
    ) -> Result<ProxyResponse, UpstreamPassthroughError>;
}
