//! The LauraDB client: database-level operations and collection handles.

use std::sync::Arc;

use tracing::info;

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::transport::{HttpTransport, Method, Transport};

/// A client for a LauraDB server.
///
/// The client owns an injectable [`Transport`] handle; cloning is cheap and
/// shares the underlying connection pool. Lifecycle: connect, perform calls,
/// drop — dropping the last clone tears the pool down.
///
/// # Example
///
/// ```rust,no_run
/// use lauradb_client::{ClientConfig, LauraClient};
///
/// # async fn run() -> Result<(), lauradb_client::ClientError> {
/// let client = LauraClient::connect(ClientConfig::new("localhost", 8080))?;
/// if client.ping().await {
///     let users = client.collection("users");
///     users.insert_one(serde_json::json!({"name": "Alice", "age": 30})).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LauraClient {
    transport: Arc<dyn Transport>,
}

impl LauraClient {
    /// Connect to a server using the HTTP transport.
    pub fn connect(config: ClientConfig) -> ClientResult<Self> {
        let transport = HttpTransport::new(&config)?;
        info!(
            host = %config.host,
            port = config.port,
            https = config.https,
            "LauraDB client created"
        );
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client over an explicitly provided transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Check if the server is reachable and responding.
    ///
    /// This is a liveness probe, not result delivery: every failure is
    /// swallowed and reported as `false`.
    pub async fn ping(&self) -> bool {
        self.transport
            .execute(Method::Get, "/ping", None)
            .await
            .is_ok()
    }

    /// Get database statistics.
    pub async fn stats(&self) -> ClientResult<serde_json::Value> {
        self.transport.execute(Method::Get, "/stats", None).await
    }

    /// List all collections in the database.
    pub async fn list_collections(&self) -> ClientResult<Vec<String>> {
        let result = self
            .transport
            .execute(Method::Get, "/collections", None)
            .await?;
        let names = result
            .get("collections")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    /// Create a new collection.
    pub async fn create_collection(&self, name: &str) -> ClientResult<()> {
        self.transport
            .execute(Method::Post, &format!("/collections/{name}"), None)
            .await?;
        Ok(())
    }

    /// Drop a collection.
    pub async fn drop_collection(&self, name: &str) -> ClientResult<()> {
        self.transport
            .execute(Method::Delete, &format!("/collections/{name}"), None)
            .await?;
        Ok(())
    }

    /// Get a handle for operations on one collection.
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(Arc::clone(&self.transport), name)
    }
}
