//! Local validation errors raised while building expressions.

use thiserror::Error;

/// Result type for expression construction.
pub type QueryResult<T> = Result<T, QueryError>;

/// A malformed expression, rejected locally before any network call.
///
/// Distinct from the client crate's transport and API errors: a `QueryError`
/// means the request was never sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A `$group` accumulator tried to use the reserved `_id` output key.
    #[error("accumulator output key `_id` is reserved for the group key")]
    ReservedAccumulatorKey,

    /// A compound `$group` key named no fields.
    #[error("compound group key must name at least one field")]
    EmptyGroupKey,

    /// A `$geoWithin` polygon carried no coordinate pairs.
    #[error("$geoWithin polygon must contain at least one coordinate pair")]
    EmptyPolygon,
}
