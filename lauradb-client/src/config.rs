//! Client connection configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// LauraDB connection configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Use HTTPS instead of HTTP.
    pub https: bool,
    /// Per-request timeout. A timed-out call surfaces as a transport error
    /// and leaves no residual state.
    pub timeout: Duration,
    /// Maximum number of pooled connections.
    pub max_connections: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            https: false,
            timeout: Duration::from_secs(30),
            max_connections: 10,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// The base URL all request paths are resolved against.
    pub fn base_url(&self) -> ClientResult<Url> {
        let scheme = if self.https { "https" } else { "http" };
        let raw = format!("{}://{}:{}", scheme, self.host, self.port);
        Url::parse(&raw).map_err(|e| ClientError::config(format!("invalid base URL {raw}: {e}")))
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    https: Option<bool>,
    timeout: Option<Duration>,
    max_connections: Option<usize>,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enable or disable HTTPS.
    pub fn https(mut self, https: bool) -> Self {
        self.https = Some(https);
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum number of pooled connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            https: self.https.unwrap_or(defaults.https),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.https);
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .host("db.internal")
            .port(9090)
            .https(true)
            .timeout(Duration::from_secs(5))
            .max_connections(32)
            .build();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 9090);
        assert!(config.https);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.base_url().unwrap().as_str(), "https://db.internal:9090/");
    }
}
