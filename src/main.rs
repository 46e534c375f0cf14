use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod routing;
mod server;

use crate::config::{AppState, Config};
use crate::error::ServerError;

fn main() -> ExitCode {
    ExitCode::from(exit_status(run()))
}

/// Log a startup or runtime failure once and map it to a process status
fn exit_status(result: Result<(), ServerError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            logger::log_error(&e.to_string());
            1
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_debug(&format!("[CONFIG] Using {workers} worker threads"));
    } else {
        logger::log_debug("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let addr = cfg.get_socket_addr()?;

    // A listener that cannot start is fatal
    let listener = server::create_listener(addr)?;
    let local_addr = listener.local_addr()?;

    let router = handler::build_router(&cfg)?;
    let state = Arc::new(AppState::new(cfg, router));

    server::start_signal_handler(Arc::clone(&state.signals))?;
    logger::log_server_start(&local_addr, &state.config);

    server::start_server_loop(listener, state).await;
    logger::log_info("Server stopped");
    Ok(())
}
