//! Server configuration
//!
//! Loads HTTP settings from environment variables.

use std::time::Duration;

/// Default interval between two polls of a streamed log
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default interval between two WebSocket pings
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// Base URL under which the server is reachable, used in status links
    pub public_url: String,

    /// How often a streamed log is checked for changes
    pub poll_interval: Duration,

    /// How often an idle stream is pinged
    pub ping_interval: Duration,
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PORT (optional, default: 8080)
    /// - SICURO_BIND_ADDR (optional, default: 0.0.0.0:$PORT)
    /// - SICURO_PUBLIC_URL (optional, default: http://localhost:$PORT)
    /// - SICURO_STREAM_POLL_MS (optional, default: 1000)
    pub fn from_env() -> anyhow::Result<Self> {
        let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

        let bind_addr =
            std::env::var("SICURO_BIND_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{}", port));

        let public_url = std::env::var("SICURO_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let poll_interval = match std::env::var("SICURO_STREAM_POLL_MS") {
            Ok(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("SICURO_STREAM_POLL_MS must be a number of milliseconds")
            })?),
            Err(_) => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            poll_interval,
            ..Self::new(bind_addr, public_url)
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Link to the log page of a job
    pub fn log_url(&self, log_name: &str) -> String {
        format!("{}/ci/{}", self.public_url, log_name)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            anyhow::bail!("public_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.ping_interval.is_zero() {
            anyhow::bail!("ping_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0:8080", "http://localhost:8080")
    }
}
