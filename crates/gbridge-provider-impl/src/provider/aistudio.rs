use std::time::Instant;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::{info, warn};

use gbridge_protocol::gemini::generate_content::request::{
    GenerateContentPath, GenerateContentRequestBody,
};
use gbridge_provider_core::{
    CallContext, Provider, ProxyRequest, ProxyResponse, UpstreamPassthroughError,
};
use gbridge_transform::generate_content::openai_chat2gemini::{DEFAULT_MODEL, MediaFetcher};

use crate::dispatch::{DispatchPlan, DispatchProvider, TransformPlan, dispatch_request};
use crate::fetch::WreqMediaFetcher;
use crate::upstream::{handle_response, network_failure};

pub const PROVIDER_NAME: &str = "aistudio";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const API_CLIENT: &str = "genai-js/0.21.0";

#[derive(Debug, Clone)]
pub struct AistudioSettings {
    pub base_url: String,
    pub default_model: String,
}

impl Default for AistudioSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Gemini API (AI Studio) behind an OpenAI chat-completions front.
pub struct AistudioProvider {
    settings: AistudioSettings,
    client: wreq::Client,
    fetcher: WreqMediaFetcher,
}

impl AistudioProvider {
    pub fn new(settings: AistudioSettings, client: wreq::Client) -> Self {
        let fetcher = WreqMediaFetcher::new(client.clone());
        Self {
            settings,
            client,
            fetcher,
        }
    }

    async fn handle_generate(
        &self,
        path: GenerateContentPath,
        body: GenerateContentRequestBody,
        is_stream: bool,
        ctx: CallContext,
    ) -> Result<ProxyResponse, UpstreamPassthroughError> {
        let model = path.model;
        let (op, method) = if is_stream {
            ("gemini.stream_generate", "streamGenerateContent")
        } else {
            ("gemini.generate", "generateContent")
        };
        let path = format!("/{API_VERSION}/models/{model}:{method}");
        let url = build_url(&self.settings.base_url, &path);
        let headers = build_gemini_headers(&ctx.api_key)?;

        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            trace_id = %ctx.trace_id,
            request_id = ctx.request_id.as_deref().unwrap_or("-"),
            provider = %PROVIDER_NAME,
            op = op,
            method = "POST",
            path = %path,
            model = %model,
            is_stream = is_stream
        );
        let mut request = self.client.post(url).headers(headers).json(&body);
        if is_stream {
            request = request.query(&[("alt", "sse")]);
        }
        let response = request.send().await.map_err(|err| {
            warn!(
                event = "upstream_response",
                trace_id = %ctx.trace_id,
                provider = %PROVIDER_NAME,
                op = op,
                status = "error",
                elapsed_ms = started_at.elapsed().as_millis(),
                error = %err
            );
            network_failure(err)
        })?;
        info!(
            event = "upstream_response",
            trace_id = %ctx.trace_id,
            provider = %PROVIDER_NAME,
            op = op,
            status = %response.status().as_u16(),
            elapsed_ms = started_at.elapsed().as_millis(),
            is_stream = is_stream
        );
        handle_response(response, is_stream).await
    }
}

#[async_trait]
impl Provider for AistudioProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn call(
        &self,
        req: ProxyRequest,
        ctx: CallContext,
    ) -> Result<ProxyResponse, UpstreamPassthroughError> {
        dispatch_request(self, req, ctx).await
    }
}

#[async_trait]
impl DispatchProvider for AistudioProvider {
    fn dispatch_plan(&self, req: ProxyRequest) -> DispatchPlan {
        match req {
            ProxyRequest::GeminiGenerate(request) => {
                DispatchPlan::Native(ProxyRequest::GeminiGenerate(request))
            }
            ProxyRequest::GeminiGenerateStream(request) => {
                DispatchPlan::Native(ProxyRequest::GeminiGenerateStream(request))
            }
            ProxyRequest::OpenAIChat(request) => {
                DispatchPlan::Transform(TransformPlan::OpenAIChat2Gemini(request))
            }
            ProxyRequest::OpenAIChatStream(request) => {
                DispatchPlan::Transform(TransformPlan::OpenAIChatStream2Gemini(request))
            }
        }
    }

    fn default_model(&self) -> &str {
        &self.settings.default_model
    }

    fn media_fetcher(&self) -> &dyn MediaFetcher {
        &self.fetcher
    }

    async fn call_native(
        &self,
        req: ProxyRequest,
        ctx: CallContext,
    ) -> Result<ProxyResponse, UpstreamPassthroughError> {
        match req {
            ProxyRequest::GeminiGenerate(request) => {
                self.handle_generate(request.path, request.body, false, ctx)
                    .await
            }
            ProxyRequest::GeminiGenerateStream(request) => {
                self.handle_generate(request.path, request.body, true, ctx)
                    .await
            }
            ProxyRequest::OpenAIChat(_) | ProxyRequest::OpenAIChatStream(_) => {
                Err(UpstreamPassthroughError::from_status(
                    StatusCode::NOT_IMPLEMENTED,
                    format!("{PROVIDER_NAME} has no native openai chat endpoint"),
                ))
            }
        }
    }
}

fn build_gemini_headers(api_key: &str) -> Result<HeaderMap, UpstreamPassthroughError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key)
            .map_err(|err| UpstreamPassthroughError::bad_request(err.to_string()))?,
    );
    headers.insert("x-goog-api-client", HeaderValue::from_static(API_CLIENT));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mut path = path.trim_start_matches('/');
    if base.ends_with("/v1beta") && (path == "v1beta" || path.starts_with("v1beta/")) {
        path = path.trim_start_matches("v1beta/").trim_start_matches("v1beta");
    }
    format!("{base}/{path}")
}
