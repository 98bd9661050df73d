//! Aggregation pipelines, stages, and accumulators.
//!
//! A pipeline is an ordered sequence of stages. Stage order is the contract
//! with the server: it is transmitted exactly as given, never merged or
//! reordered client-side.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::value::{Expr, FieldRef};

/// Sort direction; serializes as `1` (ascending) or `-1` (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl Order {
    /// The wire form of this direction.
    pub fn wire_value(self) -> i64 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// The `_id` selector of a `$group` stage: a single field reference or a
/// compound key mapping output keys to field references.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Group by one field, e.g. `"$city"`.
    Field(FieldRef),
    /// Group by a compound key, e.g. `{"city": "$city", "year": "$year"}`.
    Compound(IndexMap<String, FieldRef>),
}

impl GroupKey {
    /// Group by a single field.
    pub fn field(name: impl Into<FieldRef>) -> Self {
        Self::Field(name.into())
    }

    /// Group by a compound key of named field references.
    pub fn compound<K, F>(pairs: impl IntoIterator<Item = (K, F)>) -> Self
    where
        K: Into<String>,
        F: Into<FieldRef>,
    {
        Self::Compound(
            pairs
                .into_iter()
                .map(|(k, f)| (k.into(), f.into()))
                .collect(),
        )
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Field(f) => f.to_json(),
            Self::Compound(map) => {
                let mut out = serde_json::Map::new();
                for (k, f) in map {
                    out.insert(k.clone(), f.to_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }
}

impl From<FieldRef> for GroupKey {
    fn from(f: FieldRef) -> Self {
        Self::Field(f)
    }
}

/// An accumulator expression reducing grouped documents to one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    op: &'static str,
    expr: Option<Expr>,
}

impl Accumulator {
    /// Serialize to the wire shape, e.g. `{"$avg": "$age"}`.
    ///
    /// `count` has no operand and serializes as `{"$count": {}}` so that it
    /// stays distinguishable from `sum` of the literal `1`.
    pub fn to_json(&self) -> serde_json::Value {
        let operand = match &self.expr {
            Some(expr) => expr.to_json(),
            None => serde_json::Value::Object(serde_json::Map::new()),
        };
        let mut map = serde_json::Map::new();
        map.insert(self.op.to_string(), operand);
        serde_json::Value::Object(map)
    }
}

/// Accumulators for use in `$group` stages.
///
/// Each takes an [`Expr`], keeping field references (`Expr::field`) and
/// literal constants (`Expr::literal`) apart: `sum(Expr::literal(1))` means
/// "count one per document", not "the field named 1".
pub mod acc {
    use super::Accumulator;
    use crate::value::Expr;

    /// Sum values (`$sum`).
    pub fn sum(expr: Expr) -> Accumulator {
        Accumulator { op: "$sum", expr: Some(expr) }
    }

    /// Average values (`$avg`).
    pub fn avg(expr: Expr) -> Accumulator {
        Accumulator { op: "$avg", expr: Some(expr) }
    }

    /// Minimum value (`$min`).
    pub fn min(expr: Expr) -> Accumulator {
        Accumulator { op: "$min", expr: Some(expr) }
    }

    /// Maximum value (`$max`).
    pub fn max(expr: Expr) -> Accumulator {
        Accumulator { op: "$max", expr: Some(expr) }
    }

    /// Count grouped documents (`$count`); serializes as `{"$count": {}}`.
    pub fn count() -> Accumulator {
        Accumulator { op: "$count", expr: None }
    }

    /// Collect values into an array (`$push`).
    pub fn push(expr: Expr) -> Accumulator {
        Accumulator { op: "$push", expr: Some(expr) }
    }

    /// Collect unique values into an array (`$addToSet`).
    pub fn add_to_set(expr: Expr) -> Accumulator {
        Accumulator { op: "$addToSet", expr: Some(expr) }
    }

    /// First value in the group (`$first`).
    pub fn first(expr: Expr) -> Accumulator {
        Accumulator { op: "$first", expr: Some(expr) }
    }

    /// Last value in the group (`$last`).
    pub fn last(expr: Expr) -> Accumulator {
        Accumulator { op: "$last", expr: Some(expr) }
    }
}

/// Expression operators for `$project` stages.
pub mod expr {
    use crate::value::{Expr, OpArgs};

    /// Concatenate strings (`$concat`).
    pub fn concat(parts: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Op("$concat".to_string(), OpArgs::List(parts.into_iter().collect()))
    }

    /// Extract a substring (`$substr`).
    pub fn substr(source: Expr, start: i64, length: i64) -> Expr {
        Expr::Op(
            "$substr".to_string(),
            OpArgs::List(vec![source, Expr::literal(start), Expr::literal(length)]),
        )
    }

    /// Convert to uppercase (`$toUpper`).
    pub fn to_upper(source: Expr) -> Expr {
        Expr::Op("$toUpper".to_string(), OpArgs::Unary(Box::new(source)))
    }

    /// Convert to lowercase (`$toLower`).
    pub fn to_lower(source: Expr) -> Expr {
        Expr::Op("$toLower".to_string(), OpArgs::Unary(Box::new(source)))
    }

    /// Conditional expression (`$cond`).
    pub fn cond(condition: Expr, if_true: Expr, if_false: Expr) -> Expr {
        Expr::Op(
            "$cond".to_string(),
            OpArgs::List(vec![condition, if_true, if_false]),
        )
    }
}

/// One entry of a `$project` stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    /// Include the field; serializes as `1`.
    Include,
    /// Exclude the field; serializes as `0`.
    Exclude,
    /// Compute the field from an expression.
    Compute(Expr),
}

impl ProjectField {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Include => serde_json::Value::from(1),
            Self::Exclude => serde_json::Value::from(0),
            Self::Compute(expr) => expr.to_json(),
        }
    }
}

impl From<Expr> for ProjectField {
    fn from(expr: Expr) -> Self {
        Self::Compute(expr)
    }
}

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Filter documents (`$match`).
    Match(Filter),
    /// Group documents and reduce with accumulators (`$group`).
    Group {
        /// The `_id` group key.
        key: GroupKey,
        /// Output key to accumulator, in order.
        accumulators: IndexMap<String, Accumulator>,
    },
    /// Include, exclude, or compute fields (`$project`).
    Project(IndexMap<String, ProjectField>),
    /// Sort documents (`$sort`).
    Sort(Vec<(String, Order)>),
    /// Keep at most `n` documents (`$limit`).
    Limit(u64),
    /// Skip the first `n` documents (`$skip`).
    Skip(u64),
    /// Deconstruct an array field into one document per element (`$unwind`).
    Unwind {
        /// The array field to unwind.
        path: FieldRef,
        /// Keep documents where the field is null, absent, or empty.
        preserve_null_and_empty: bool,
    },
    /// Left outer join with another collection (`$lookup`).
    Lookup {
        /// Collection to join with.
        from: String,
        /// Field from the input documents.
        local_field: String,
        /// Field from the joined collection's documents.
        foreign_field: String,
        /// Output array field name.
        as_field: String,
    },
}

impl Stage {
    /// Filter documents (`$match`).
    pub fn match_(filter: Filter) -> Self {
        Self::Match(filter)
    }

    /// Group documents by `key` and reduce with `accumulators`.
    ///
    /// Fails locally when the compound key is empty or an accumulator output
    /// key is the reserved `_id`.
    pub fn group<K: Into<String>>(
        key: impl Into<GroupKey>,
        accumulators: impl IntoIterator<Item = (K, Accumulator)>,
    ) -> QueryResult<Self> {
        let key = key.into();
        if let GroupKey::Compound(map) = &key {
            if map.is_empty() {
                return Err(QueryError::EmptyGroupKey);
            }
        }
        let accumulators: IndexMap<String, Accumulator> = accumulators
            .into_iter()
            .map(|(k, a)| (k.into(), a))
            .collect();
        if accumulators.contains_key("_id") {
            return Err(QueryError::ReservedAccumulatorKey);
        }
        Ok(Self::Group { key, accumulators })
    }

    /// Include, exclude, or compute fields (`$project`).
    pub fn project<K, F>(fields: impl IntoIterator<Item = (K, F)>) -> Self
    where
        K: Into<String>,
        F: Into<ProjectField>,
    {
        Self::Project(
            fields
                .into_iter()
                .map(|(k, f)| (k.into(), f.into()))
                .collect(),
        )
    }

    /// Sort documents (`$sort`).
    pub fn sort<K: Into<String>>(fields: impl IntoIterator<Item = (K, Order)>) -> Self {
        Self::Sort(fields.into_iter().map(|(k, o)| (k.into(), o)).collect())
    }

    /// Keep at most `n` documents (`$limit`).
    pub fn limit(n: u64) -> Self {
        Self::Limit(n)
    }

    /// Skip the first `n` documents (`$skip`).
    pub fn skip(n: u64) -> Self {
        Self::Skip(n)
    }

    /// Unwind an array field; serializes as the bare `"$field"` shape.
    pub fn unwind(path: impl Into<FieldRef>) -> Self {
        Self::Unwind {
            path: path.into(),
            preserve_null_and_empty: false,
        }
    }

    /// Unwind an array field, keeping documents where it is null or empty;
    /// serializes as the `{"path": .., "preserveNullAndEmptyArrays": true}`
    /// shape.
    pub fn unwind_preserving(path: impl Into<FieldRef>) -> Self {
        Self::Unwind {
            path: path.into(),
            preserve_null_and_empty: true,
        }
    }

    /// Left outer join with another collection (`$lookup`).
    pub fn lookup(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self::Lookup {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
        }
    }

    /// Serialize to the wire shape.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Match(filter) => single_key("$match", filter.to_json()),
            Self::Group { key, accumulators } => {
                let mut group = serde_json::Map::new();
                group.insert("_id".to_string(), key.to_json());
                for (k, a) in accumulators {
                    group.insert(k.clone(), a.to_json());
                }
                single_key("$group", serde_json::Value::Object(group))
            }
            Self::Project(fields) => {
                let mut out = serde_json::Map::new();
                for (k, f) in fields {
                    out.insert(k.clone(), f.to_json());
                }
                single_key("$project", serde_json::Value::Object(out))
            }
            Self::Sort(fields) => {
                let mut out = serde_json::Map::new();
                for (k, order) in fields {
                    out.insert(k.clone(), serde_json::Value::from(order.wire_value()));
                }
                single_key("$sort", serde_json::Value::Object(out))
            }
            Self::Limit(n) => single_key("$limit", serde_json::Value::from(*n)),
            Self::Skip(n) => single_key("$skip", serde_json::Value::from(*n)),
            Self::Unwind {
                path,
                preserve_null_and_empty,
            } => {
                if *preserve_null_and_empty {
                    let mut inner = serde_json::Map::new();
                    inner.insert("path".to_string(), path.to_json());
                    inner.insert(
                        "preserveNullAndEmptyArrays".to_string(),
                        serde_json::Value::Bool(true),
                    );
                    single_key("$unwind", serde_json::Value::Object(inner))
                } else {
                    single_key("$unwind", path.to_json())
                }
            }
            Self::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                let mut inner = serde_json::Map::new();
                inner.insert("from".to_string(), serde_json::Value::String(from.clone()));
                inner.insert(
                    "localField".to_string(),
                    serde_json::Value::String(local_field.clone()),
                );
                inner.insert(
                    "foreignField".to_string(),
                    serde_json::Value::String(foreign_field.clone()),
                );
                inner.insert("as".to_string(), serde_json::Value::String(as_field.clone()));
                single_key("$lookup", serde_json::Value::Object(inner))
            }
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// An ordered aggregation pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage, preserving order.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// The stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Serialize to the wire shape: an ordered JSON array of stages.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.stages.iter().map(Stage::to_json).collect())
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Pipeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn single_key(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OpArgs;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_match_stage() {
        let stage = Stage::match_(Filter::gte("age", 18));
        assert_eq!(stage.to_json(), json!({"$match": {"age": {"$gte": 18}}}));
    }

    #[test]
    fn test_group_with_count() {
        let stage = Stage::group(
            GroupKey::field("city"),
            [("n", acc::count())],
        )
        .unwrap();
        // count() must stay an empty-object accumulator, not {"$sum": 1}.
        assert_eq!(
            stage.to_json(),
            json!({"$group": {"_id": "$city", "n": {"$count": {}}}})
        );
    }

    #[test]
    fn test_group_accumulators() {
        let stage = Stage::group(
            GroupKey::field("$city"),
            [
                ("avgAge", acc::avg(Expr::field("age"))),
                ("total", acc::sum(Expr::field("amount"))),
                ("perDoc", acc::sum(Expr::literal(1))),
                ("names", acc::push(Expr::field("name"))),
            ],
        )
        .unwrap();
        assert_eq!(
            stage.to_json(),
            json!({"$group": {
                "_id": "$city",
                "avgAge": {"$avg": "$age"},
                "total": {"$sum": "$amount"},
                "perDoc": {"$sum": 1},
                "names": {"$push": "$name"},
            }})
        );
    }

    #[test]
    fn test_group_compound_key() {
        let stage = Stage::group(
            GroupKey::compound([("city", "city"), ("year", "year")]),
            [("n", acc::count())],
        )
        .unwrap();
        assert_eq!(
            stage.to_json(),
            json!({"$group": {
                "_id": {"city": "$city", "year": "$year"},
                "n": {"$count": {}},
            }})
        );
    }

    #[test]
    fn test_group_rejects_reserved_key() {
        let err = Stage::group(GroupKey::field("city"), [("_id", acc::count())]).unwrap_err();
        assert_eq!(err, QueryError::ReservedAccumulatorKey);
    }

    #[test]
    fn test_group_rejects_empty_compound_key() {
        let empty: Vec<(String, FieldRef)> = vec![];
        let err = Stage::group(GroupKey::compound(empty), [("n", acc::count())]).unwrap_err();
        assert_eq!(err, QueryError::EmptyGroupKey);
    }

    #[test]
    fn test_project_stage() {
        let stage = Stage::project([
            ("name", ProjectField::Include),
            ("_id", ProjectField::Exclude),
            (
                "fullName",
                ProjectField::Compute(expr::concat([
                    Expr::field("firstName"),
                    Expr::literal(" "),
                    Expr::field("lastName"),
                ])),
            ),
        ]);
        assert_eq!(
            stage.to_json(),
            json!({"$project": {
                "name": 1,
                "_id": 0,
                "fullName": {"$concat": ["$firstName", " ", "$lastName"]},
            }})
        );
    }

    #[test]
    fn test_projection_expression_operators() {
        assert_eq!(
            expr::substr(Expr::field("name"), 0, 5).to_json(),
            json!({"$substr": ["$name", 0, 5]})
        );
        assert_eq!(expr::to_upper(Expr::field("name")).to_json(), json!({"$toUpper": "$name"}));
        assert_eq!(expr::to_lower(Expr::field("email")).to_json(), json!({"$toLower": "$email"}));
        assert_eq!(
            expr::cond(
                Expr::Op(
                    "$gte".to_string(),
                    OpArgs::List(vec![Expr::field("age"), Expr::literal(18)]),
                ),
                Expr::literal("adult"),
                Expr::literal("minor"),
            )
            .to_json(),
            json!({"$cond": [{"$gte": ["$age", 18]}, "adult", "minor"]})
        );
    }

    #[test]
    fn test_sort_limit_skip() {
        let stage = Stage::sort([("avgAge", Order::Desc), ("name", Order::Asc)]);
        assert_eq!(stage.to_json(), json!({"$sort": {"avgAge": -1, "name": 1}}));
        assert_eq!(Stage::limit(10).to_json(), json!({"$limit": 10}));
        assert_eq!(Stage::skip(20).to_json(), json!({"$skip": 20}));
    }

    #[test]
    fn test_unwind_both_wire_shapes() {
        assert_eq!(Stage::unwind("tags").to_json(), json!({"$unwind": "$tags"}));
        assert_eq!(
            Stage::unwind_preserving("tags").to_json(),
            json!({"$unwind": {"path": "$tags", "preserveNullAndEmptyArrays": true}})
        );
    }

    #[test]
    fn test_lookup_stage() {
        let stage = Stage::lookup("orders", "userId", "_id", "userOrders");
        assert_eq!(
            stage.to_json(),
            json!({"$lookup": {
                "from": "orders",
                "localField": "userId",
                "foreignField": "_id",
                "as": "userOrders",
            }})
        );
    }

    #[test]
    fn test_pipeline_preserves_stage_order() {
        let pipeline = Pipeline::new()
            .stage(Stage::match_(Filter::gte("age", 18)))
            .stage(Stage::group(GroupKey::field("city"), [("n", acc::count())]).unwrap())
            .stage(Stage::sort([("n", Order::Desc)]));

        let json = pipeline.to_json();
        let stages = json.as_array().unwrap();
        assert_eq!(stages.len(), 3);
        assert!(stages[0].get("$match").is_some());
        assert!(stages[1].get("$group").is_some());
        assert!(stages[2].get("$sort").is_some());
    }
}
