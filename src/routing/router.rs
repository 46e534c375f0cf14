//! Path router
//!
//! Maps path patterns to handlers. A router is built once at startup and
//! handed to the server; there is no process-wide routing table.
//!
//! Pattern syntax:
//! - `/` or `/exact/path`: the path must match exactly
//! - `/prefix/*`: matches `/prefix` and everything below `/prefix/`
//!
//! Exact patterns win over prefix patterns, and among prefix patterns the
//! longest one wins. Paths with no match get the default 404 response.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};

use crate::error::{Result, ServerError};
use crate::http;
use crate::logger;

/// Future returned by a handler
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response<Full<Bytes>>> + Send>>;

/// Type-erased request handler
pub type Handler<B> = Arc<dyn Fn(Request<B>) -> ResponseFuture + Send + Sync>;

/// Parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    /// Stored with its trailing slash, e.g. "/static/"
    Prefix(String),
}

impl Pattern {
    fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| ServerError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if pattern.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }

        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('/') && !prefix.contains('*') => {
                Ok(Self::Prefix(prefix.to_string()))
            }
            Some(_) => Err(invalid("'*' is only allowed as a trailing '/*'")),
            None if pattern.contains('*') => {
                Err(invalid("'*' is only allowed as a trailing '/*'"))
            }
            None => Ok(Self::Exact(pattern.to_string())),
        }
    }
}

/// Path-pattern router with explicit ownership
pub struct Router<B = Incoming> {
    exact: HashMap<String, Handler<B>>,
    /// Kept sorted by prefix length, longest first
    prefixes: Vec<(String, Handler<B>)>,
}

impl<B: Send + 'static> Router<B> {
    pub fn new() -> Self {
        Self {
            exact: HashMap::new(),
            prefixes: Vec::new(),
        }
    }

    /// Register `handler` for `pattern`
    pub fn handle<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response<Full<Bytes>>> + Send + 'static,
    {
        let erased: Handler<B> =
            Arc::new(move |req: Request<B>| -> ResponseFuture { Box::pin(handler(req)) });

        match Pattern::parse(pattern)? {
            Pattern::Exact(path) => {
                if self.exact.contains_key(&path) {
                    return Err(ServerError::DuplicatePattern(pattern.to_string()));
                }
                self.exact.insert(path, erased);
            }
            Pattern::Prefix(prefix) => {
                if self.prefixes.iter().any(|(p, _)| *p == prefix) {
                    return Err(ServerError::DuplicatePattern(pattern.to_string()));
                }
                self.prefixes.push((prefix, erased));
                self.prefixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
            }
        }

        logger::log_debug(&format!("Registered route: {pattern}"));
        Ok(self)
    }

    /// Find the handler responsible for `path`
    pub fn lookup(&self, path: &str) -> Option<&Handler<B>> {
        if let Some(handler) = self.exact.get(path) {
            return Some(handler);
        }

        self.prefixes
            .iter()
            .find(|(prefix, _)| {
                path.starts_with(prefix.as_str()) || path == &prefix[..prefix.len() - 1]
            })
            .map(|(_, handler)| handler)
    }

    /// Run the matching handler, or answer 404
    pub fn dispatch(&self, req: Request<B>) -> ResponseFuture {
        match self.lookup(req.uri().path()) {
            Some(handler) => handler(req),
            None => Box::pin(async { http::build_404_response() }),
        }
    }
}

impl<B: Send + 'static> Default for Router<B> {
    fn default() -> Self {
        Self::new()
    }
}
