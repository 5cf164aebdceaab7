//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use saga::{ExecutorConfig, RetryPolicy};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for the default format
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `SAGA_MAX_ATTEMPTS`: attempts per operation (default: `3`)
/// - `SAGA_INITIAL_INTERVAL_MS`: first retry delay (default: `1000`)
/// - `SAGA_MAX_INTERVAL_MS`: retry delay cap (default: `10000`)
/// - `SAGA_BACKOFF_COEFFICIENT`: retry delay multiplier (default: `2.0`)
/// - `SAGA_TIMEOUT_SECS`: start-to-close timeout per attempt (default: `300`)
/// - `SIMULATED_LATENCY_MS`: latency of each simulated operation (default: `500`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub retry: RetryPolicy,
    pub operation_timeout: Duration,
    pub simulated_latency: Duration,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let retry = RetryPolicy::new(
            env_or("SAGA_MAX_ATTEMPTS", defaults.retry.max_attempts),
            Duration::from_millis(env_or(
                "SAGA_INITIAL_INTERVAL_MS",
                defaults.retry.initial_interval.as_millis() as u64,
            )),
            Duration::from_millis(env_or(
                "SAGA_MAX_INTERVAL_MS",
                defaults.retry.maximum_interval.as_millis() as u64,
            )),
            env_or("SAGA_BACKOFF_COEFFICIENT", defaults.retry.backoff_coefficient),
        );

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match std::env::var("LOG_FORMAT") {
                Ok(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            retry,
            operation_timeout: Duration::from_secs(env_or(
                "SAGA_TIMEOUT_SECS",
                defaults.operation_timeout.as_secs(),
            )),
            simulated_latency: Duration::from_millis(env_or(
                "SIMULATED_LATENCY_MS",
                defaults.simulated_latency.as_millis() as u64,
            )),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the executor policy for every saga operation.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_timeout(self.operation_timeout)
            .with_retry(self.retry)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            retry: RetryPolicy::DEFAULT,
            operation_timeout: ExecutorConfig::DEFAULT.start_to_close_timeout,
            simulated_latency: Duration::from_millis(500),
        }
    }
}
