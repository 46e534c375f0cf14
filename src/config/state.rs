// Application state module
// Shared by the accept loop and every connection task

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::types::Config;
use crate::logger::LogFormat;
use crate::routing::Router;
use crate::server::SignalHandler;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Routing table built at startup and owned here
    pub router: Router,
    /// Parsed once from `logging.access_log_format`
    pub access_log_format: LogFormat,
    /// Connections currently being served
    pub active_connections: AtomicUsize,
    pub signals: Arc<SignalHandler>,
}

impl AppState {
    pub fn new(config: Config, router: Router) -> Self {
        let access_log_format = LogFormat::parse(&config.logging.access_log_format);
        Self {
            config,
            router,
            access_log_format,
            active_connections: AtomicUsize::new(0),
            signals: Arc::new(SignalHandler::new()),
        }
    }
}
