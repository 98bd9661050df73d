//! Filter expression trees for selecting documents.

use serde::{Serialize, Serializer};

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// A filter predicate over documents.
///
/// Filters are immutable value trees built from constructor functions and
/// serialized into the MongoDB-style wire shape on demand. Construction never
/// touches the network.
///
/// # Example
///
/// ```rust
/// use lauradb_query::Filter;
///
/// let filter = Filter::and([
///     Filter::gte("age", 25),
///     Filter::lt("age", 40),
///     Filter::eq("active", true),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document; serializes as `{}`.
    Empty,

    /// Equality comparison (`$eq`).
    Eq(String, Value),
    /// Inequality comparison (`$ne`).
    Ne(String, Value),
    /// Greater-than comparison (`$gt`).
    Gt(String, Value),
    /// Greater-than-or-equal comparison (`$gte`).
    Gte(String, Value),
    /// Less-than comparison (`$lt`).
    Lt(String, Value),
    /// Less-than-or-equal comparison (`$lte`).
    Lte(String, Value),

    /// Value in a list (`$in`).
    In(String, Vec<Value>),
    /// Value not in a list (`$nin`).
    Nin(String, Vec<Value>),

    /// Field presence check (`$exists`).
    Exists(String, bool),
    /// Field type check (`$type`).
    Type(String, String),

    /// Array contains all values (`$all`).
    All(String, Vec<Value>),
    /// Array element matches a nested filter (`$elemMatch`).
    ElemMatch(String, Box<Filter>),
    /// Array length check (`$size`).
    Size(String, i64),

    /// Regular expression match (`$regex`).
    Regex(String, String),
    /// Full-text search (`$text`/`$search`).
    Text(String),

    /// Proximity to a point (`$near`).
    Near {
        /// Field holding the coordinates.
        field: String,
        /// Longitude of the reference point.
        longitude: f64,
        /// Latitude of the reference point.
        latitude: f64,
        /// Maximum distance from the point, if bounded.
        max_distance: Option<f64>,
    },
    /// Containment in a polygon (`$geoWithin`).
    GeoWithin {
        /// Field holding the coordinates.
        field: String,
        /// Polygon vertices as `(longitude, latitude)` pairs.
        coordinates: Vec<(f64, f64)>,
    },

    /// Logical conjunction (`$and`). An empty operand list is kept and
    /// serializes as `{"$and": []}`, the vacuously-true identity.
    And(Vec<Filter>),
    /// Logical disjunction (`$or`).
    Or(Vec<Filter>),
    /// Logical negation (`$not`); takes exactly one operand.
    Not(Box<Filter>),
}

impl Filter {
    /// Filter that matches every document.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Equal to (`$eq`).
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// Not equal to (`$ne`).
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    /// Greater than (`$gt`).
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    /// Greater than or equal to (`$gte`).
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(field.into(), value.into())
    }

    /// Less than (`$lt`).
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// Less than or equal to (`$lte`).
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    /// Value in a list (`$in`).
    pub fn in_array<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Value not in a list (`$nin`).
    pub fn not_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Nin(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Field exists (`$exists`).
    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::Exists(field.into(), exists)
    }

    /// Field has the given type (`$type`).
    pub fn type_is(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Type(field.into(), type_name.into())
    }

    /// Array contains all values (`$all`).
    pub fn all<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::All(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Array element matches a nested filter (`$elemMatch`).
    pub fn elem_match(field: impl Into<String>, condition: Filter) -> Self {
        Self::ElemMatch(field.into(), Box::new(condition))
    }

    /// Array has the given length (`$size`).
    pub fn size(field: impl Into<String>, size: i64) -> Self {
        Self::Size(field.into(), size)
    }

    /// Regular expression match (`$regex`).
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Regex(field.into(), pattern.into())
    }

    /// Full-text search (`$text`).
    pub fn text(search: impl Into<String>) -> Self {
        Self::Text(search.into())
    }

    /// Proximity to a point (`$near`).
    pub fn near(
        field: impl Into<String>,
        longitude: f64,
        latitude: f64,
        max_distance: Option<f64>,
    ) -> Self {
        Self::Near {
            field: field.into(),
            longitude,
            latitude,
            max_distance,
        }
    }

    /// Containment in a polygon (`$geoWithin`). The polygon must carry at
    /// least one vertex; an empty one is rejected before any network call.
    pub fn geo_within(
        field: impl Into<String>,
        coordinates: Vec<(f64, f64)>,
    ) -> QueryResult<Self> {
        if coordinates.is_empty() {
            return Err(QueryError::EmptyPolygon);
        }
        Ok(Self::GeoWithin {
            field: field.into(),
            coordinates,
        })
    }

    /// Logical AND (`$and`). Operands are kept verbatim, including none.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// Logical OR (`$or`).
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// Logical NOT (`$not`) of exactly one filter.
    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Check if this filter matches everything.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Serialize to the wire shape.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Object(serde_json::Map::new()),

            Self::Eq(f, v) => field_op(f, "$eq", v.to_json()),
            Self::Ne(f, v) => field_op(f, "$ne", v.to_json()),
            Self::Gt(f, v) => field_op(f, "$gt", v.to_json()),
            Self::Gte(f, v) => field_op(f, "$gte", v.to_json()),
            Self::Lt(f, v) => field_op(f, "$lt", v.to_json()),
            Self::Lte(f, v) => field_op(f, "$lte", v.to_json()),

            Self::In(f, vs) => field_op(f, "$in", values_json(vs)),
            Self::Nin(f, vs) => field_op(f, "$nin", values_json(vs)),

            Self::Exists(f, e) => field_op(f, "$exists", serde_json::Value::Bool(*e)),
            Self::Type(f, t) => field_op(f, "$type", serde_json::Value::String(t.clone())),

            Self::All(f, vs) => field_op(f, "$all", values_json(vs)),
            Self::ElemMatch(f, cond) => field_op(f, "$elemMatch", cond.to_json()),
            Self::Size(f, n) => field_op(f, "$size", serde_json::Value::from(*n)),

            Self::Regex(f, pattern) => {
                field_op(f, "$regex", serde_json::Value::String(pattern.clone()))
            }
            Self::Text(search) => {
                let mut inner = serde_json::Map::new();
                inner.insert("$search".to_string(), serde_json::Value::String(search.clone()));
                single_key("$text", serde_json::Value::Object(inner))
            }

            Self::Near {
                field,
                longitude,
                latitude,
                max_distance,
            } => {
                let mut near = serde_json::Map::new();
                near.insert(
                    "coordinates".to_string(),
                    serde_json::Value::Array(vec![
                        serde_json::Value::from(*longitude),
                        serde_json::Value::from(*latitude),
                    ]),
                );
                if let Some(max) = max_distance {
                    near.insert("maxDistance".to_string(), serde_json::Value::from(*max));
                }
                field_op(field, "$near", serde_json::Value::Object(near))
            }
            Self::GeoWithin { field, coordinates } => {
                let coords = coordinates
                    .iter()
                    .map(|(lon, lat)| {
                        serde_json::Value::Array(vec![
                            serde_json::Value::from(*lon),
                            serde_json::Value::from(*lat),
                        ])
                    })
                    .collect();
                let mut within = serde_json::Map::new();
                within.insert("coordinates".to_string(), serde_json::Value::Array(coords));
                field_op(field, "$geoWithin", serde_json::Value::Object(within))
            }

            Self::And(filters) => single_key("$and", filters_json(filters)),
            Self::Or(filters) => single_key("$or", filters_json(filters)),
            Self::Not(filter) => single_key("$not", filter.to_json()),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::Empty
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn single_key(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

fn field_op(field: &str, op: &str, operand: serde_json::Value) -> serde_json::Value {
    let mut inner = serde_json::Map::new();
    inner.insert(op.to_string(), operand);
    single_key(field, serde_json::Value::Object(inner))
}

fn values_json(values: &[Value]) -> serde_json::Value {
    serde_json::Value::Array(values.iter().map(Value::to_json).collect())
}

fn filters_json(filters: &[Filter]) -> serde_json::Value {
    serde_json::Value::Array(filters.iter().map(Filter::to_json).collect())
}
