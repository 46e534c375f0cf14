//! Request handler module
//!
//! Holds the echo responder and the route table the server starts with.

pub mod echo;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::routing::Router;

pub use echo::EchoHandler;

/// Pattern the echo responder is registered under
pub const ECHO_PATTERN: &str = "/";

/// Build the application's router: the echo responder on `/`, 404 elsewhere
pub fn build_router(cfg: &Config) -> Result<Router> {
    let echo = Arc::new(EchoHandler::from_config(cfg));

    let mut router: Router = Router::new();
    router.handle(ECHO_PATTERN, move |req| {
        let echo = Arc::clone(&echo);
        async move { echo.respond(req).await }
    })?;

    Ok(router)
}
