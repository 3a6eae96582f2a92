mod plan;
mod stream;
mod transform;

pub use plan::{DispatchPlan, TransformPlan};
pub use stream::ChatStreamPipeline;

use async_trait::async_trait;

use gbridge_provider_core::{CallContext, ProxyRequest, ProxyResponse, UpstreamPassthroughError};
use gbridge_transform::generate_content::openai_chat2gemini::MediaFetcher;

#[async_trait]
pub trait DispatchProvider: Send + Sync {
    fn dispatch_plan(&self, req: ProxyRequest) -> DispatchPlan;

    /// Upstream model for inbound names that are not Gemini models.
    fn default_model(&self) -> &str;

    /// Used to inline remote `image_url` parts while translating a request.
    fn media_fetcher(&self) -> &dyn MediaFetcher;

    async fn call_native(
        &self,
        req: ProxyRequest,
        ctx: CallContext,
    ) -> Result<ProxyResponse, UpstreamPassthroughError>;
}

pub async fn dispatch_request<P: DispatchProvider>(
    provider: &P,
    req: ProxyRequest,
    ctx: CallContext,
) -> Result<ProxyResponse, UpstreamPassthroughError> {
    match provider.dispatch_plan(req) {
        DispatchPlan::Native(req) => provider.call_native(req, ctx).await,
        DispatchPlan::Transform(plan) => transform::dispatch_transform(provider, plan, ctx).await,
    }
}
