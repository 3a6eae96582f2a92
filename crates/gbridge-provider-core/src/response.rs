use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

pub struct StreamBody {
    pub content_type: &'static str,
    pub stream: ByteStream,
}

impl StreamBody {
    pub fn new<S>(content_type: &'static str, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    {
        Self {
            content_type,
            stream: Box::pin(stream),
        }
    }
}

impl fmt::Debug for StreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBody")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ProxyResponse {
    Json {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    Stream {
        status: StatusCode,
        headers: HeaderMap,
        body: StreamBody,
    },
}

impl ProxyResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyResponse::Json { status, .. } | ProxyResponse::Stream { status, .. } => *status,
        }
    }
}

/// A response that goes back to the client as is: either the upstream's own
/// non-2xx reply or a locally produced plain-text error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("upstream error {status}")]
pub struct UpstreamPassthroughError {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamPassthroughError {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(message.into()),
        }
    }

    /// Rejected client input; nothing was sent upstream.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::UNAUTHORIZED, message)
    }

    /// Transport failure or an upstream body that could not be read.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[test]
    fn local_errors_are_plain_text() {
        let err = UpstreamPassthroughError::bad_request("unsupported response_format.type");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "unsupported response_format.type");
        assert_eq!(
            err.headers.get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(err.to_string(), "upstream error 400 Bad Request");
    }

    #[test]
    fn upstream_errors_keep_status_headers_and_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let err = UpstreamPassthroughError::new(
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            Bytes::from_static(b"{\"error\":{\"code\":429}}"),
        );
        assert_eq!(err.status.as_u16(), 429);
        assert_eq!(err.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(err.body, Bytes::from_static(b"{\"error\":{\"code\":429}}"));
    }

    #[test]
    fn status_reads_either_variant() {
        let json = ProxyResponse::Json {
            status: StatusCode::CREATED,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert_eq!(json.status(), StatusCode::CREATED);

        let stream = ProxyResponse::Stream {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: StreamBody::new(
                "text/event-stream",
                futures_util::stream::empty::<Result<Bytes, std::io::Error>>(),
            ),
        };
        assert_eq!(stream.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn stream_body_yields_items_in_order() {
        let items = vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"b"))];
        let mut body = StreamBody::new("text/event-stream", futures_util::stream::iter(items));
        assert_eq!(body.stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(body.stream.next().await.unwrap().unwrap(), "b");
        assert!(body.stream.next().await.is_none());
    }
}
