use std::io;

use futures_util::StreamExt;

use gbridge_provider_core::{ProxyResponse, StreamBody, UpstreamPassthroughError};

/// The backend could not be reached or its body could not be read.
pub fn network_failure(err: wreq::Error) -> UpstreamPassthroughError {
    UpstreamPassthroughError::internal(err.to_string())
}

/// Non-2xx replies become a passthrough error carrying the upstream status,
/// headers and body untouched. Success bodies are buffered (unary) or handed
/// on as a byte stream.
pub async fn handle_response(
    response: wreq::Response,
    is_stream: bool,
) -> Result<ProxyResponse, UpstreamPassthroughError> {
    let status = response.status();
    let headers = response.headers().clone();

    if !status.is_success() {
        let body = response.bytes().await.map_err(network_failure)?;
        return Err(UpstreamPassthroughError::new(status, headers, body));
    }

    if is_stream {
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|err| io::Error::other(err.to_string())));
        Ok(ProxyResponse::Stream {
            status,
            headers,
            body: StreamBody::new("text/event-stream", stream),
        })
    } else {
        let body = response.bytes().await.map_err(network_failure)?;
        Ok(ProxyResponse::Json {
            status,
            headers,
            body,
        })
    }
}
