use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;
use uuid::Uuid;

use gbridge_protocol::openai::create_chat_completions::request::{
    CreateChatCompletionRequest, CreateChatCompletionRequestBody,
};
use gbridge_provider_core::{CallContext, ProxyRequest, ProxyResponse, UpstreamPassthroughError};

use crate::core::CoreState;

pub async fn chat_completions_handler(
    State(state): State<Arc<CoreState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(api_key) = api_key(&headers).or_else(|| state.fallback_api_key.clone()) else {
        return passthrough_error(UpstreamPassthroughError::unauthorized("missing api key"));
    };

    // Malformed bodies never reach the provider.
    let body = match serde_json::from_slice::<CreateChatCompletionRequestBody>(&body) {
        Ok(body) => body,
        Err(err) => {
            return passthrough_error(UpstreamPassthroughError::bad_request(err.to_string()));
        }
    };

    let ctx = CallContext {
        trace_id: Uuid::new_v4().to_string(),
        request_id: request_id(&headers),
        api_key,
    };
    debug!(
        trace_id = %ctx.trace_id,
        provider = %state.provider.name(),
        stream = body.is_stream(),
        "chat completion"
    );

    let trace_id = ctx.trace_id.clone();
    let request = ProxyRequest::openai_chat(CreateChatCompletionRequest { body });
    match state.provider.call(request, ctx).await {
        Ok(response) => {
            debug!(trace_id = %trace_id, status = %response.status(), "chat completion answered");
            proxy_response(response)
        }
        Err(err) => {
            debug!(trace_id = %trace_id, status = %err.status, "chat completion failed");
            passthrough_error(err)
        }
    }
}

fn proxy_response(response: ProxyResponse) -> Response {
    match response {
        ProxyResponse::Json {
            status,
            headers,
            body,
        } => {
            let mut resp = Response::new(Body::from(body));
            *resp.status_mut() = status;
            resp.headers_mut().extend(headers);
            resp
        }
        ProxyResponse::Stream {
            status,
            headers,
            body,
        } => {
            let mut resp = Response::new(Body::from_stream(body.stream));
            *resp.status_mut() = status;
            resp.headers_mut().extend(headers);
            if !resp.headers().contains_key(CONTENT_TYPE) {
                resp.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type));
            }
            resp
        }
    }
}

fn passthrough_error(err: UpstreamPassthroughError) -> Response {
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp.headers_mut().extend(err.headers);
    resp
}

/// The token after the scheme of `Authorization: <scheme> <token>`.
fn api_key(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (_, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("request-id"))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
