// Server loop module
// Accepts connections until shutdown is requested, then drains them

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::drain::drain_connections;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener` until `state.signals` requests shutdown.
///
/// Accept errors are logged and the loop keeps going. On shutdown the
/// listener is closed first, then open connections get up to
/// `performance.shutdown_timeout` seconds to finish.
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>) {
    let shutdown = state.signals.shutdown.notified();
    tokio::pin!(shutdown);
    shutdown.as_mut().enable();

    if !state.signals.is_shutdown_requested() {
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                        Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                    }
                }

                () = &mut shutdown => {
                    logger::log_info("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }
    }

    // Close listener so new connections are refused while draining
    drop(listener);

    let timeout = Duration::from_secs(state.config.performance.shutdown_timeout);
    drain_connections(&state, timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::build_router;
    use crate::server::create_listener;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::client::conn::http1::{self, SendRequest};
    use hyper::{Method, Request, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::net::SocketAddr;
    use std::sync::atomic::Ordering;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    const QUIET: &str = "[logging]\naccess_log = false\n";

    async fn spawn_server(toml: &str) -> (SocketAddr, Arc<AppState>, JoinHandle<()>) {
        let cfg = Config::from_toml_str(toml).unwrap();
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(&cfg).unwrap();
        let state = Arc::new(AppState::new(cfg, router));
        let handle = tokio::spawn(start_server_loop(listener, Arc::clone(&state)));
        (addr, state, handle)
    }

    async fn connect(addr: SocketAddr) -> SendRequest<Full<Bytes>> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (sender, conn) = http1::handshake(TokioIo::new(stream)).await.unwrap();
        tokio::spawn(async move {
            let _ = conn.await;
        });
        sender
    }

    async fn send(
        sender: &mut SendRequest<Full<Bytes>>,
        method: Method,
        path: &str,
        body: &'static str,
    ) -> hyper::Result<(StatusCode, String)> {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let bytes = resp.into_body().collect().await?.to_bytes();
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }

    #[tokio::test]
    async fn test_get_root_without_body() {
        let (addr, _state, _handle) = spawn_server(QUIET).await;
        let mut client = connect(addr).await;

        let (status, body) = send(&mut client, Method::GET, "/", "").await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello, \r\n");
    }

    #[tokio::test]
    async fn test_post_root_echoes_body() {
        let (addr, _state, _handle) = spawn_server(QUIET).await;
        let mut client = connect(addr).await;

        let (status, body) = send(&mut client, Method::POST, "/", "Discord!").await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello, Discord!");
    }

    #[tokio::test]
    async fn test_post_many_bodies_on_one_connection() {
        let (addr, _state, _handle) = spawn_server(QUIET).await;
        let mut client = connect(addr).await;

        for body in ["", "a", "two words", "line\nbreak", "ünïcödé"] {
            let (_, reply) = send(&mut client, Method::POST, "/", body).await.unwrap();
            assert_eq!(reply, format!("Hello, {body}"));
        }
    }

    #[tokio::test]
    async fn test_other_paths_are_404() {
        let (addr, _state, _handle) = spawn_server(QUIET).await;
        let mut client = connect(addr).await;

        for path in ["/other", "/index.html", "/a/b/c"] {
            let (status, body) = send(&mut client, Method::GET, path, "").await.unwrap();
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, "404 Not Found");
        }
    }

    #[tokio::test]
    async fn test_access_log_enabled_still_serves() {
        let (addr, _state, _handle) = spawn_server("[logging]\naccess_log_format = \"json\"").await;
        let mut client = connect(addr).await;

        let (_, body) = send(&mut client, Method::POST, "/?x=1", "logged").await.unwrap();
        assert_eq!(body, "Hello, logged");
    }

    #[tokio::test]
    async fn test_connection_limit_rejects_excess() {
        let (addr, state, _handle) =
            spawn_server(&format!("{QUIET}[performance]\nmax_connections = 1\n")).await;

        let mut first = connect(addr).await;
        send(&mut first, Method::GET, "/", "").await.unwrap();
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 1);

        let mut second = connect(addr).await;
        assert!(send(&mut second, Method::GET, "/", "").await.is_err());

        // The first connection is unaffected
        let (_, body) = send(&mut first, Method::POST, "/", "still here").await.unwrap();
        assert_eq!(body, "Hello, still here");
    }

    #[tokio::test]
    async fn test_connection_timeout_closes_connection() {
        let (addr, state, _handle) =
            spawn_server(&format!("{QUIET}[performance]\nconnection_timeout = 1\n")).await;
        let mut client = connect(addr).await;

        let started = Instant::now();
        let (_, body) = send(&mut client, Method::POST, "/", "before").await.unwrap();
        assert_eq!(body, "Hello, before");

        tokio::time::timeout(Duration::from_secs(5), async {
            while !client.is_closed() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("connection should be closed by its lifetime limit");

        assert!(started.elapsed() >= Duration::from_millis(900));
        assert!(send(&mut client, Method::GET, "/", "").await.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keep_alive_disabled_serves_one_request() {
        let (addr, _state, _handle) =
            spawn_server(&format!("{QUIET}[performance]\nkeep_alive = false\n")).await;
        let mut client = connect(addr).await;

        let (_, body) = send(&mut client, Method::POST, "/", "only once").await.unwrap();
        assert_eq!(body, "Hello, only once");

        let second = tokio::time::timeout(
            Duration::from_secs(5),
            send(&mut client, Method::POST, "/", "again"),
        )
        .await
        .expect("second request should fail rather than hang");
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_header_read_timeout_closes_slow_client() {
        let (addr, _state, _handle) =
            spawn_server(&format!("{QUIET}[performance]\nheader_read_timeout = 1\n")).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n").await.unwrap();

        let started = Instant::now();
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
            .await
            .expect("server should close a connection stuck in its headers")
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(900));
        assert!(!String::from_utf8_lossy(&buf).contains("Hello"));
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_stops_accepting() {
        let (addr, state, handle) = spawn_server(QUIET).await;

        // An idle keep-alive connection must not hold shutdown open
        let mut client = connect(addr).await;
        send(&mut client, Method::GET, "/", "").await.unwrap();

        state.signals.request_shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server loop should stop")
            .unwrap();

        assert_eq!(state.active_connections.load(Ordering::SeqCst), 0);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_returns_promptly() {
        let cfg = Config::from_toml_str(QUIET).unwrap();
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let router = build_router(&cfg).unwrap();
        let state = Arc::new(AppState::new(cfg, router));
        state.signals.request_shutdown();

        tokio::time::timeout(Duration::from_secs(1), start_server_loop(listener, state))
            .await
            .expect("loop should exit without accepting");
    }
}
