//! Update documents and the update composer.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::value::Value;

/// Position argument for `$pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pop {
    /// Remove the first array element; serializes as `-1`.
    First,
    /// Remove the last array element; serializes as `1`.
    Last,
}

/// Bitwise operation for `$bit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
}

impl BitOp {
    fn wire_name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        }
    }
}

/// An update document: a mapping from update operator to field-level changes.
///
/// Updates are built incrementally from single-operator constructors and
/// collapsed into one request body with [`Update::combine`] or
/// [`Update::merge`]. Operators accumulate across inputs; within one operator
/// the later write to a field wins.
///
/// # Example
///
/// ```rust
/// use lauradb_query::Update;
///
/// let update = Update::combine([
///     Update::set("name", "Alice"),
///     Update::inc("views", 1),
///     Update::push("tags", "rust"),
/// ]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: IndexMap<String, IndexMap<String, Value>>,
}

impl Update {
    fn with(op: &str, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(field.into(), value.into());
        let mut ops = IndexMap::new();
        ops.insert(op.to_string(), fields);
        Self { ops }
    }

    /// Set a field value (`$set`).
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with("$set", field, value)
    }

    /// Remove a field (`$unset`).
    pub fn unset(field: impl Into<String>) -> Self {
        Self::with("$unset", field, "")
    }

    /// Rename a field (`$rename`).
    pub fn rename(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::with("$rename", old_name, new_name.into())
    }

    /// Set a field to the current date/time (`$currentDate`).
    pub fn current_date(field: impl Into<String>) -> Self {
        Self::with("$currentDate", field, true)
    }

    /// Increment a numeric field (`$inc`).
    pub fn inc(field: impl Into<String>, amount: impl Into<Value>) -> Self {
        Self::with("$inc", field, amount)
    }

    /// Multiply a numeric field (`$mul`).
    pub fn mul(field: impl Into<String>, multiplier: impl Into<Value>) -> Self {
        Self::with("$mul", field, multiplier)
    }

    /// Update if the given value is less than the current one (`$min`).
    pub fn min(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with("$min", field, value)
    }

    /// Update if the given value is greater than the current one (`$max`).
    pub fn max(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with("$max", field, value)
    }

    /// Append to an array (`$push`).
    pub fn push(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with("$push", field, value)
    }

    /// Remove matching values from an array (`$pull`).
    pub fn pull(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with("$pull", field, value)
    }

    /// Remove multiple values from an array (`$pullAll`).
    pub fn pull_all<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::with(
            "$pullAll",
            field,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Append a value unless already present (`$addToSet`).
    pub fn add_to_set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with("$addToSet", field, value)
    }

    /// Remove the first or last array element (`$pop`).
    pub fn pop(field: impl Into<String>, position: Pop) -> Self {
        let wire = match position {
            Pop::First => -1i64,
            Pop::Last => 1i64,
        };
        Self::with("$pop", field, wire)
    }

    /// Apply a bitwise operation to an integer field (`$bit`).
    pub fn bit(field: impl Into<String>, op: BitOp, value: i64) -> Self {
        let mut inner = IndexMap::new();
        inner.insert(op.wire_name().to_string(), Value::Int(value));
        Self::with("$bit", field, Value::Object(inner))
    }

    /// Merge another update into this one. Operator maps accumulate; within
    /// one operator, fields from `other` overwrite fields already present.
    pub fn merge(mut self, other: Update) -> Self {
        for (op, fields) in other.ops {
            let entry = self.ops.entry(op).or_default();
            for (field, value) in fields {
                entry.insert(field, value);
            }
        }
        self
    }

    /// Collapse several partial updates into one well-formed update document.
    pub fn combine(updates: impl IntoIterator<Item = Update>) -> Self {
        updates
            .into_iter()
            .fold(Update::default(), |acc, update| acc.merge(update))
    }

    /// Check whether this update carries no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Serialize to the wire shape.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for (op, fields) in &self.ops {
            let mut inner = serde_json::Map::new();
            for (field, value) in fields {
                inner.insert(field.clone(), value.to_json());
            }
            out.insert(op.clone(), serde_json::Value::Object(inner));
        }
        serde_json::Value::Object(out)
    }
}

impl Serialize for Update {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
