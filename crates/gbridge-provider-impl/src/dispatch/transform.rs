use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::unfold;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use serde::Serialize;
use serde::de::DeserializeOwned;

use gbridge_protocol::gemini::generate_content::response::GenerateContentResponse as GeminiGenerateContentResponse;
use gbridge_protocol::gemini::stream_content::request::StreamGenerateContentRequest;
use gbridge_provider_core::{
    CallContext, ProxyRequest, ProxyResponse, StreamBody, UpstreamPassthroughError,
};
use gbridge_transform::TransformError;
use gbridge_transform::generate_content::openai_chat2gemini::GeminiToOpenAIChatStreamState;
use gbridge_transform::generate_content::openai_chat2gemini::request::transform_request;
use gbridge_transform::generate_content::openai_chat2gemini::response::{
    generate_chat_completion_id, transform_response,
};

use super::DispatchProvider;
use super::plan::TransformPlan;
use super::stream::{ChatStreamPipeline, scrub_headers};

const EVENT_STREAM: &str = "text/event-stream";

pub(super) async fn dispatch_transform<P: DispatchProvider>(
    provider: &P,
    plan: TransformPlan,
    ctx: CallContext,
) -> Result<ProxyResponse, UpstreamPassthroughError> {
    match plan {
        TransformPlan::OpenAIChat2Gemini(request) => {
            let gemini_request =
                transform_request(request, provider.default_model(), provider.media_fetcher())
                    .await
                    .map_err(client_input_error)?;
            let model = gemini_request.path.model.clone();
            let response = provider
                .call_native(ProxyRequest::GeminiGenerate(gemini_request), ctx)
                .await?;
            let id = generate_chat_completion_id();
            transform_json_response(response, |response: GeminiGenerateContentResponse| {
                transform_response(response, &model, id)
            })
        }
        TransformPlan::OpenAIChatStream2Gemini(request) => {
            let include_usage = request.body.include_usage();
            let gemini_request =
                transform_request(request, provider.default_model(), provider.media_fetcher())
                    .await
                    .map_err(client_input_error)?;
            let model = gemini_request.path.model.clone();
            let stream_request = StreamGenerateContentRequest {
                path: gemini_request.path,
                body: gemini_request.body,
            };
            let response = provider
                .call_native(ProxyRequest::GeminiGenerateStream(stream_request), ctx)
                .await?;
            let state = GeminiToOpenAIChatStreamState::new(
                generate_chat_completion_id(),
                model,
                include_usage,
            );
            transform_gemini_stream(response, ChatStreamPipeline::new(state))
        }
    }
}

fn client_input_error(err: TransformError) -> UpstreamPassthroughError {
    UpstreamPassthroughError::bad_request(err.to_string())
}

fn transform_json_response<T, U>(
    response: ProxyResponse,
    transform: impl FnOnce(T) -> U,
) -> Result<ProxyResponse, UpstreamPassthroughError>
where
    T: DeserializeOwned,
    U: Serialize,
{
    match response {
        ProxyResponse::Json {
            status,
            mut headers,
            body,
        } => {
            let parsed = serde_json::from_slice::<T>(&body)
                .map_err(|err| UpstreamPassthroughError::internal(err.to_string()))?;
            let mapped = transform(parsed);
            let mapped_body = serde_json::to_vec(&mapped)
                .map_err(|err| UpstreamPassthroughError::internal(err.to_string()))?;
            scrub_headers(&mut headers);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Ok(ProxyResponse::Json {
                status,
                headers,
                body: Bytes::from(mapped_body),
            })
        }
        ProxyResponse::Stream { .. } => Err(UpstreamPassthroughError::internal(
            "expected json response",
        )),
    }
}

/// Drives the pipeline off the upstream body. Nothing is spawned: dropping
/// the returned stream drops the upstream connection with it.
fn transform_gemini_stream(
    response: ProxyResponse,
    pipeline: ChatStreamPipeline,
) -> Result<ProxyResponse, UpstreamPassthroughError> {
    match response {
        ProxyResponse::Stream {
            status,
            mut headers,
            body,
        } => {
            scrub_headers(&mut headers);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));

            let stream = unfold(
                (body.stream, Some(pipeline), VecDeque::<Bytes>::new()),
                |(mut upstream, mut pipeline, mut pending)| async move {
                    loop {
                        if let Some(item) = pending.pop_front() {
                            return Some((Ok(item), (upstream, pipeline, pending)));
                        }
                        let Some(active) = pipeline.as_mut() else {
                            return None;
                        };
                        match upstream.next().await {
                            Some(Ok(bytes)) => pending.extend(active.push(&bytes)),
                            Some(Err(err)) => {
                                // Later frames would be built on a gap; stop here.
                                pipeline = None;
                                return Some((Err(err), (upstream, pipeline, pending)));
                            }
                            None => {
                                if let Some(finished) = pipeline.take() {
                                    pending.extend(finished.finish());
                                }
                            }
                        }
                    }
                },
            );
            Ok(ProxyResponse::Stream {
                status,
                headers,
                body: StreamBody::new(EVENT_STREAM, stream),
            })
        }
        ProxyResponse::Json { .. } => Err(UpstreamPassthroughError::internal(
            "expected stream response",
        )),
    }
}
