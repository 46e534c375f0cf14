// Configuration module entry point
// Loads static configuration and owns the shared runtime state

mod address;
mod state;
mod types;

use std::net::SocketAddr;

use hyper::header::HeaderValue;

use crate::error::{Result, ServerError};
use crate::logger::LogLevel;

// Re-export public types
pub use address::resolve_listen_addr;
pub use state::AppState;
pub use types::Config;

/// Environment variable naming the config file (extension optional)
pub const CONFIG_FILE_ENV: &str = "ECHO_CONFIG_FILE";

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Load configuration from `$ECHO_CONFIG_FILE`, falling back to "config"
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. `ECHO_`-prefixed environment variables override it,
    /// with `__` separating nested keys (`ECHO_SERVER__LISTEN=:9000`).
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ECHO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from an in-memory TOML document over the defaults
    #[cfg(test)]
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        resolve_listen_addr(&self.server.listen)
    }

    /// Reject values that deserialize fine but cannot run
    pub fn validate(&self) -> Result<()> {
        self.get_socket_addr()?;

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ServerError::InvalidConfig(format!(
                "unknown log level '{}' (expected error, warn, info or debug)",
                self.logging.level
            )));
        }
        if self.server.workers == Some(0) {
            return Err(ServerError::InvalidConfig(
                "server.workers must be at least 1".to_string(),
            ));
        }
        if HeaderValue::from_str(&self.http.default_content_type).is_err() {
            return Err(ServerError::InvalidConfig(format!(
                "http.default_content_type {:?} is not a valid header value",
                self.http.default_content_type
            )));
        }
        if self.http.max_body_size == 0 {
            return Err(ServerError::InvalidConfig(
                "http.max_body_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn with_defaults(builder: Builder) -> std::result::Result<Builder, config::ConfigError> {
    builder
        .set_default("server.listen", ":8080")?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.header_read_timeout", 30)?
        .set_default("performance.connection_timeout", 0)?
        .set_default("performance.shutdown_timeout", 10)?
        .set_default("http.default_content_type", "text/plain; charset=utf-8")?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("echo.greeting", "Hello, ")?
        .set_default("echo.empty_get_suffix", "\r\n")?
        .set_default("echo.abort_on_body_error", false)
}
