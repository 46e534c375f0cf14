// Connection handling module
// Accepts one TCP connection and serves HTTP/1.1 on it until it closes

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::Full;
use hyper::body::{Body, Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Version};
use hyper_util::rt::{TokioIo, TokioTimer};

use crate::config::AppState;
use crate::logger::{self, AccessLogEntry};

/// Accept a connection, enforcing the connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve a single connection in a spawned task.
///
/// The task:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 keep-alive and header read timeout
/// 3. Serves requests through the router
/// 4. Switches to graceful shutdown when the server is stopping
/// 5. Decrements the connection counter when done
fn handle_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let perf = &state.config.performance;

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive).timer(TokioTimer::new());
        if perf.header_read_timeout > 0 {
            builder.header_read_timeout(Duration::from_secs(perf.header_read_timeout));
        }

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { Ok::<_, Infallible>(serve_request(req, &state, peer_addr).await) }
            }),
        );
        tokio::pin!(conn);

        // Register for shutdown before checking the flag so no wakeup is missed
        let shutdown = state.signals.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();
        let mut draining = state.signals.is_shutdown_requested();
        if draining {
            conn.as_mut().graceful_shutdown();
        }

        let lifetime = lifetime_limit(perf.connection_timeout);
        tokio::pin!(lifetime);

        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        logger::log_connection_error(&err);
                    }
                    break;
                }
                () = &mut shutdown, if !draining => {
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
                () = &mut lifetime => {
                    logger::log_warning(&format!(
                        "Connection from {peer_addr} closed after {} seconds",
                        perf.connection_timeout
                    ));
                    break;
                }
            }
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Completes after `secs` seconds, or never when `secs` is 0
async fn lifetime_limit(secs: u64) {
    if secs == 0 {
        std::future::pending::<()>().await;
    } else {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

/// Dispatch one request through the router and write its access log line
async fn serve_request(
    req: Request<Incoming>,
    state: &AppState,
    peer_addr: SocketAddr,
) -> Response<Full<Bytes>> {
    if !state.config.logging.access_log {
        return state.router.dispatch(req).await;
    }

    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);
    let resp = state.router.dispatch(req).await;

    entry.status = resp.status().as_u16();
    entry.body_bytes = resp.body().size_hint().exact().unwrap_or(0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &state.access_log_format);

    resp
}

/// Capture the request side of an access log entry
fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: hyper::header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header(hyper::header::REFERER);
    entry.user_agent = header(hyper::header::USER_AGENT);
    entry.request_bytes = header(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
