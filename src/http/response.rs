//! HTTP response building module
//!
//! Provides builders for the responses the dispatcher sends, all sharing the
//! streaming [`ResponseBody`].

use super::body::ResponseBody;
use super::cache::CachePolicy;
use crate::handler::ChunkStream;
use hyper::header::{HeaderMap, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};

/// Build a plain-text response, used for not-found and load failures
pub fn build_text_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .header(CACHE_CONTROL, CachePolicy::NoStore.to_header_value())
        .body(ResponseBody::text(message))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            build_empty_response(status)
        })
}

/// Build a response with no body, used when a handler fails before streaming
pub fn build_empty_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = status;
    response
}

/// Build a response streaming a handler's chunks under the head it set
pub fn build_streaming_response(
    status: StatusCode,
    headers: HeaderMap,
    stream: ChunkStream,
) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::new(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::chunks;
    use http_body_util::BodyExt;
    use hyper::header::HeaderValue;

    #[tokio::test]
    async fn test_text_response() {
        let response = build_text_response(StatusCode::NOT_FOUND, "missing");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"missing");
    }

    #[tokio::test]
    async fn test_streaming_response_keeps_head() {
        let mut headers = HeaderMap::new();
        headers.insert("x-scriptlet", HeaderValue::from_static("yes"));
        let response =
            build_streaming_response(StatusCode::CREATED, headers, chunks::iter(["a", "b"]));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-scriptlet"], "yes");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ab");
    }
}
