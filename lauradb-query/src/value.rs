//! Operand values, field references, and aggregation expressions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

/// A JSON-compatible operand value.
///
/// Filter and update operands carry arbitrary JSON, so this type covers the
/// full JSON value space while keeping expression trees statically checkable.
///
/// # Example
///
/// ```rust
/// use lauradb_query::Value;
///
/// let v = Value::from(vec![25, 30, 35]);
/// assert!(matches!(v, Value::Array(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key/value mapping with preserved insertion order.
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to the `serde_json` representation used on the wire.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        v.to_json()
    }
}

/// A reference to a document field inside an aggregation expression.
///
/// On the wire a field reference is a string carrying a leading `$` sigil
/// (`"$city"`), distinguishing it from a literal string. The sigil convention
/// is kept explicit in the type system so a literal `1` passed to `sum` can
/// never be confused with a field named `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef(String);

impl FieldRef {
    /// Create a field reference. A leading `$` in `name` is accepted and
    /// stripped, so `FieldRef::new("city")` and `FieldRef::new("$city")`
    /// are the same reference.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix('$') {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(name),
        }
    }

    /// The field name without the sigil.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The wire form, sigil included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(format!("${}", self.0))
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Serialize for FieldRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// An aggregation expression: a field reference, a literal constant, or an
/// operator applied to sub-expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A `$`-prefixed field reference.
    Field(FieldRef),
    /// A literal constant.
    Literal(Value),
    /// An operator expression, e.g. `{"$concat": [..]}` or `{"$toUpper": ..}`.
    Op(String, OpArgs),
}

/// Operand shape of an operator expression.
#[derive(Debug, Clone, PartialEq)]
pub enum OpArgs {
    /// Single operand: `{"$toUpper": "$name"}`.
    Unary(Box<Expr>),
    /// Operand list: `{"$concat": ["$first", " ", "$last"]}`.
    List(Vec<Expr>),
}

impl Expr {
    /// Reference a field by name.
    pub fn field(name: impl Into<FieldRef>) -> Self {
        Self::Field(name.into())
    }

    /// A literal constant.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// The wire form of this expression.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Field(f) => f.to_json(),
            Self::Literal(v) => v.to_json(),
            Self::Op(name, args) => {
                let operand = match args {
                    OpArgs::Unary(expr) => expr.to_json(),
                    OpArgs::List(exprs) => {
                        serde_json::Value::Array(exprs.iter().map(Expr::to_json).collect())
                    }
                };
                let mut map = serde_json::Map::new();
                map.insert(name.clone(), operand);
                serde_json::Value::Object(map)
            }
        }
    }
}

impl From<FieldRef> for Expr {
    fn from(f: FieldRef) -> Self {
        Self::Field(f)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
    }

    #[test]
    fn test_value_json_round_trip() {
        let v = Value::from(json!({"name": "Alice", "tags": ["a", "b"], "age": 30}));
        assert_eq!(v.to_json(), json!({"name": "Alice", "tags": ["a", "b"], "age": 30}));
    }

    #[test]
    fn test_field_ref_sigil() {
        assert_eq!(FieldRef::new("city").to_json(), json!("$city"));
        assert_eq!(FieldRef::new("$city").to_json(), json!("$city"));
        assert_eq!(FieldRef::new("$city").name(), "city");
    }

    #[test]
    fn test_expr_field_vs_literal() {
        // The sigil separates a field reference from a literal string.
        assert_eq!(Expr::field("city").to_json(), json!("$city"));
        assert_eq!(Expr::literal("city").to_json(), json!("city"));
        assert_eq!(Expr::literal(1).to_json(), json!(1));
    }

    #[test]
    fn test_expr_op_shapes() {
        let unary = Expr::Op(
            "$toUpper".to_string(),
            OpArgs::Unary(Box::new(Expr::field("name"))),
        );
        assert_eq!(unary.to_json(), json!({"$toUpper": "$name"}));

        let list = Expr::Op(
            "$concat".to_string(),
            OpArgs::List(vec![Expr::field("first"), Expr::literal(" ")]),
        );
        assert_eq!(list.to_json(), json!({"$concat": ["$first", " "]}));
    }
}
