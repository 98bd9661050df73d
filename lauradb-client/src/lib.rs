//! Async HTTP client for the LauraDB document database.
//!
//! The client speaks a JSON envelope protocol over HTTP. Expression values
//! built with [`lauradb_query`] serialize into request bodies unchanged; the
//! transport layer unwraps response envelopes and classifies failures into
//! [`ClientError::Transport`] (the request never completed an HTTP exchange,
//! or the exchange itself failed) and [`ClientError::Api`] (the server
//! processed the request and rejected it).
//!
//! ```no_run
//! use lauradb_client::{ClientConfig, LauraClient};
//! use lauradb_query::{Filter, Update};
//!
//! # async fn demo() -> Result<(), lauradb_client::ClientError> {
//! let client = LauraClient::connect(ClientConfig::new("localhost", 8080))?;
//! let users = client.collection("users");
//!
//! let id = users
//!     .insert_one(serde_json::json!({"name": "ada", "age": 36}))
//!     .await?;
//! println!("inserted {id}");
//!
//! let modified = users
//!     .update_one(&Filter::eq("name", "ada"), &Update::inc("age", 1))
//!     .await?;
//! assert!(modified);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod transport;

pub use client::LauraClient;
pub use collection::{Collection, FindOptions, GeoType, IndexOptions, Projection};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, ClientResult};
pub use transport::{HttpTransport, Method, Transport};

/// One-stop import for client applications.
pub mod prelude {
    pub use crate::client::LauraClient;
    pub use crate::collection::{Collection, FindOptions, GeoType, IndexOptions, Projection};
    pub use crate::config::ClientConfig;
    pub use crate::error::{ClientError, ClientResult};
    pub use lauradb_query::prelude::*;
}
