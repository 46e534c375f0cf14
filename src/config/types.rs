// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub echo: EchoConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Listen address, e.g. ":8080" or "127.0.0.1:9000"
    pub listen: String,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
///
/// All durations are in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub header_read_timeout: u64,
    /// Upper bound on a connection's lifetime, 0 disables
    pub connection_timeout: u64,
    pub max_connections: Option<u64>,
    pub shutdown_timeout: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub default_content_type: String,
    pub max_body_size: u64,
}

/// Echo handler configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EchoConfig {
    /// Text written before the echoed body
    pub greeting: String,
    /// Appended to the greeting for a GET without a body
    pub empty_get_suffix: String,
    /// Reject requests whose body cannot be read instead of echoing what arrived
    pub abort_on_body_error: bool,
}
