//! The transport contract: request dispatch and response classification.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// HTTP method of a server capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// An injectable handle to the LauraDB server.
///
/// One call is one attempt: implementations must never retry, since a
/// repeated mutating request could apply twice. `execute` returns the
/// envelope's `result` payload with transport and API failures already
/// classified into [`ClientError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single request and classify the reply.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value>;
}

/// Response envelope shared by every server endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Inspect a parsed response body and split it into a result payload or an
/// API-level rejection.
///
/// A false or absent `ok` flag is a rejection; its message is taken from the
/// body's `message` field, else its `error` field, else a generic fallback.
/// A missing `result` on success is reported as JSON null.
pub(crate) fn unwrap_envelope(body: serde_json::Value) -> ClientResult<serde_json::Value> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| ClientError::transport(format!("malformed response envelope: {e}")))?;

    if !envelope.ok {
        let message = envelope
            .message
            .or(envelope.error)
            .unwrap_or_else(|| "API request failed".to_string());
        return Err(ClientError::api(message));
    }

    Ok(envelope.result.unwrap_or(serde_json::Value::Null))
}

/// HTTP transport backed by a bounded reqwest connection pool.
///
/// Lifecycle: create once, share across calls, drop to tear the pool down.
/// There is no ambient global session.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport from configuration. Retries are disabled; every
    /// call is a single attempt bounded by the configured timeout.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config.base_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_connections)
            .user_agent(concat!("LauraDB-Rust-Client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    fn request_url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::transport(format!("invalid request path {path}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        let url = self.request_url(path)?;
        debug!(method = method.as_str(), %url, "dispatching request");

        let mut request = match method {
            Method::Get => self.http.get(url.clone()),
            Method::Post => self.http.post(url.clone()),
            Method::Delete => self.http.delete(url.clone()),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ClientError::transport(format!(
                "request to {url} returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::transport(format!("invalid response body from {url}: {e}")))?;

        unwrap_envelope(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_envelope_success() {
        let result = unwrap_envelope(json!({"ok": true, "result": {"count": 3}})).unwrap();
        assert_eq!(result, json!({"count": 3}));
    }

    #[test]
    fn test_envelope_success_without_result() {
        let result = unwrap_envelope(json!({"ok": true})).unwrap();
        assert_eq!(result, serde_json::Value::Null);
    }

    #[test]
    fn test_envelope_rejection_prefers_message() {
        let err = unwrap_envelope(json!({"ok": false, "message": "duplicate key"})).unwrap_err();
        match err {
            ClientError::Api(message) => assert_eq!(message, "duplicate key"),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_rejection_falls_back_to_error_field() {
        let err = unwrap_envelope(json!({"ok": false, "error": "bad filter"})).unwrap_err();
        match err {
            ClientError::Api(message) => assert_eq!(message, "bad filter"),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_rejection_generic_fallback() {
        let err = unwrap_envelope(json!({"ok": false})).unwrap_err();
        match err {
            ClientError::Api(message) => assert_eq!(message, "API request failed"),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_absent_ok_flag_is_rejection() {
        let err = unwrap_envelope(json!({"result": {}})).unwrap_err();
        assert!(err.is_api());
    }

    #[test]
    fn test_envelope_malformed_body_is_transport() {
        let err = unwrap_envelope(json!(["not", "an", "envelope"])).unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_refusal_is_transport_not_api() {
        // Nothing listens on this port; the dispatch itself must fail.
        let config = ClientConfig::builder()
            .host("127.0.0.1")
            .port(1)
            .timeout(std::time::Duration::from_millis(500))
            .build();
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport.execute(Method::Get, "/ping", None).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_api());
    }
}
