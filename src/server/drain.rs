// Shutdown drain module
// Waits for in-flight connections to finish after the listener closes

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::config::AppState;
use crate::logger;

/// How often the connection counter is sampled while draining
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until no connection is active or `timeout` elapses.
///
/// Connections have already been told to shut down gracefully; this only
/// bounds how long the process waits for them. Returns `true` when every
/// connection finished in time.
pub async fn drain_connections(state: &AppState, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let active = state.active_connections.load(Ordering::SeqCst);
        if active == 0 {
            logger::log_info("All connections closed");
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown timeout after {}s, abandoning {active} open connection(s)",
                timeout.as_secs()
            ));
            return false;
        }

        logger::log_debug(&format!("Draining {active} connection(s)..."));
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
