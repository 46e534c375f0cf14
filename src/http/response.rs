//! HTTP response building module
//!
//! Builders for the handful of responses the server produces.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Build a response with the given status, content type and body
pub fn build_text_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let body = body.into();
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Content-Length", body.len())
        .body(Full::new(body.clone()))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(body))
        })
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    build_status_response(StatusCode::BAD_REQUEST, "400 Bad Request")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_status_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_status_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

fn build_status_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut resp = build_text_response(status, PLAIN_TEXT, Bytes::from_static(text.as_bytes()));
    // The fallback path in build_text_response cannot set a status
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        "X-Content-Type-Options",
        hyper::header::HeaderValue::from_static("nosniff"),
    );
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
