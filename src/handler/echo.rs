//! Echo responder
//!
//! Reads the whole request body and answers with a fixed greeting followed
//! by the body bytes. A GET without a body gets the greeting plus a CRLF.
//!
//! A body that cannot be read (transport error or over the size cap) is
//! logged. By default the response is still written from whatever arrived;
//! with `abort_on_body_error` the request is rejected with 400 or 413.

use std::fmt;

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use thiserror::Error;

use crate::config::Config;
use crate::http;
use crate::logger;

/// Why a request body could not be read completely
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyError {
    #[error("read failed: {0}")]
    Read(String),
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Bytes collected from a body, plus the error that stopped reading, if any
#[derive(Debug)]
pub struct BodyRead {
    pub bytes: Bytes,
    pub error: Option<BodyError>,
}

/// Read a body to end-of-stream, keeping at most `limit` bytes
///
/// End-of-stream is success. Trailers are skipped.
pub async fn read_body<B>(body: B, limit: usize) -> BodyRead
where
    B: Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut buf = Vec::new();

    let error = loop {
        let frame = match body.frame().await {
            None => break None,
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break Some(BodyError::Read(e.to_string())),
        };
        let Ok(data) = frame.into_data() else {
            continue;
        };

        let room = limit.saturating_sub(buf.len());
        if data.len() > room {
            buf.extend_from_slice(&data[..room]);
            break Some(BodyError::TooLarge { limit });
        }
        buf.extend_from_slice(&data);
    };

    BodyRead {
        bytes: Bytes::from(buf),
        error,
    }
}

/// Greeting handler bound to `/`
#[derive(Debug, Clone)]
pub struct EchoHandler {
    greeting: Bytes,
    empty_get_suffix: Bytes,
    content_type: String,
    max_body_size: usize,
    abort_on_body_error: bool,
}

impl EchoHandler {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            greeting: Bytes::from(cfg.echo.greeting.clone()),
            empty_get_suffix: Bytes::from(cfg.echo.empty_get_suffix.clone()),
            content_type: cfg.http.default_content_type.clone(),
            max_body_size: usize::try_from(cfg.http.max_body_size).unwrap_or(usize::MAX),
            abort_on_body_error: cfg.echo.abort_on_body_error,
        }
    }

    /// Handle one request
    pub async fn respond<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        if self.abort_on_body_error {
            if let Some(resp) = self.check_content_length(&req) {
                return resp;
            }
        }

        let (parts, body) = req.into_parts();
        let read = read_body(body, self.max_body_size).await;

        if let Some(err) = &read.error {
            logger::log_warning(&format!(
                "Failed to read request body for {} {}: {err} ({} bytes received)",
                parts.method,
                parts.uri.path(),
                read.bytes.len()
            ));
            if self.abort_on_body_error {
                return match err {
                    BodyError::TooLarge { .. } => http::build_413_response(),
                    BodyError::Read(_) => http::build_400_response(),
                };
            }
        }

        let body = self.compose(&parts.method, &read.bytes);
        http::build_text_response(StatusCode::OK, &self.content_type, body)
    }

    /// Greeting followed by the body; a bodiless GET/HEAD gets the suffix instead
    fn compose(&self, method: &Method, body: &[u8]) -> Bytes {
        let tail: &[u8] = if body.is_empty() && matches!(*method, Method::GET | Method::HEAD) {
            &self.empty_get_suffix
        } else {
            body
        };

        let mut out = Vec::with_capacity(self.greeting.len() + tail.len());
        out.extend_from_slice(&self.greeting);
        out.extend_from_slice(tail);
        Bytes::from(out)
    }

    /// Reject up front when Content-Length already exceeds the cap
    fn check_content_length<B>(&self, req: &Request<B>) -> Option<Response<Full<Bytes>>> {
        let value = req.headers().get(hyper::header::CONTENT_LENGTH)?;
        let size = value.to_str().ok()?.parse::<u64>().ok()?;
        if size > self.max_body_size as u64 {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {})",
                self.max_body_size
            ));
            return Some(http::build_413_response());
        }
        None
    }
}
