//! # lauradb-query
//!
//! Filter, update, and aggregation expression builders for the LauraDB
//! client.
//!
//! Expressions are immutable value trees: constructors are pure functions
//! that perform no network interaction, and composition is ordinary value
//! composition. Every constructor produces the canonical MongoDB-style wire
//! shape when serialized.
//!
//! ## Example
//!
//! ```rust
//! use lauradb_query::{acc, Expr, Filter, GroupKey, Order, Pipeline, Stage, Update};
//!
//! // A filter predicate.
//! let adults = Filter::and([Filter::gte("age", 18), Filter::eq("active", true)]);
//!
//! // An update document built incrementally.
//! let update = Update::set("name", "Alice").merge(Update::inc("views", 1));
//! assert!(!update.is_empty());
//!
//! // An aggregation pipeline; stage order is transmitted unchanged.
//! let pipeline = Pipeline::new()
//!     .stage(Stage::match_(adults))
//!     .stage(Stage::group(
//!         GroupKey::field("city"),
//!         [("avgAge", acc::avg(Expr::field("age"))), ("n", acc::count())],
//!     ).unwrap())
//!     .stage(Stage::sort([("avgAge", Order::Desc)]));
//! assert_eq!(pipeline.len(), 3);
//! ```

pub mod error;
pub mod filter;
pub mod pipeline;
pub mod update;
pub mod value;

pub use error::{QueryError, QueryResult};
pub use filter::Filter;
pub use pipeline::{acc, expr, Accumulator, GroupKey, Order, Pipeline, ProjectField, Stage};
pub use update::{BitOp, Pop, Update};
pub use value::{Expr, FieldRef, OpArgs, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::Filter;
    pub use crate::pipeline::{acc, expr, Accumulator, GroupKey, Order, Pipeline, ProjectField, Stage};
    pub use crate::update::{BitOp, Pop, Update};
    pub use crate::value::{Expr, FieldRef, Value};
}
