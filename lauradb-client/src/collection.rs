//! The collection facade: typed operations over the transport contract.

use std::sync::Arc;

use lauradb_query::{Filter, Order, Pipeline, Update};
use serde_json::json;

use crate::error::ClientResult;
use crate::transport::{Method, Transport};

/// Field projection: which fields the server should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Return only the named fields.
    Include(Vec<String>),
    /// Return everything except the named fields.
    Exclude(Vec<String>),
}

impl Projection {
    /// Project onto the named fields.
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    /// Project away the named fields.
    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    fn to_json(&self) -> serde_json::Value {
        let (fields, flag) = match self {
            Self::Include(fields) => (fields, 1),
            Self::Exclude(fields) => (fields, 0),
        };
        let mut map = serde_json::Map::new();
        for field in fields {
            map.insert(field.clone(), serde_json::Value::from(flag));
        }
        serde_json::Value::Object(map)
    }
}

/// Options for [`Collection::find`].
///
/// Every option is optional and, when not set, absent from the request body
/// entirely — the server treats absence and explicit-empty differently.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    projection: Option<Projection>,
    sort: Option<Vec<(String, Order)>>,
    skip: Option<u64>,
    limit: Option<u64>,
}

impl FindOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field projection.
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Set the sort specification.
    pub fn sort<S: Into<String>>(mut self, fields: impl IntoIterator<Item = (S, Order)>) -> Self {
        self.sort = Some(fields.into_iter().map(|(k, o)| (k.into(), o)).collect());
        self
    }

    /// Skip the first `n` matching documents.
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Return at most `n` documents.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    fn apply(&self, body: &mut serde_json::Map<String, serde_json::Value>) {
        if let Some(projection) = &self.projection {
            body.insert("projection".to_string(), projection.to_json());
        }
        if let Some(sort) = &self.sort {
            let mut map = serde_json::Map::new();
            for (field, order) in sort {
                map.insert(field.clone(), serde_json::Value::from(order.wire_value()));
            }
            body.insert("sort".to_string(), serde_json::Value::Object(map));
        }
        if let Some(skip) = self.skip {
            body.insert("skip".to_string(), serde_json::Value::from(skip));
        }
        if let Some(limit) = self.limit {
            body.insert("limit".to_string(), serde_json::Value::from(limit));
        }
    }
}

/// Options for a plain single-field index.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Enforce uniqueness.
    pub unique: bool,
    /// Index only documents that carry the field.
    pub sparse: bool,
    /// Optional index name.
    pub name: Option<String>,
}

/// Geospatial index flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoType {
    /// Planar geometry; serializes as `"2d"`.
    #[default]
    Planar2d,
    /// Spherical geometry; serializes as `"2dsphere"`.
    Sphere2d,
}

impl GeoType {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Planar2d => "2d",
            Self::Sphere2d => "2dsphere",
        }
    }
}

/// A handle for operations on one collection.
///
/// Each method maps onto a fixed server capability, sends expression values
/// as the request body, and unwraps the envelope's nested result fields into
/// a typed return value. Missing result fields default to empty/zero rather
/// than failing; transport and API errors propagate unchanged.
pub struct Collection {
    transport: Arc<dyn Transport>,
    name: String,
    base_path: String,
}

impl Collection {
    pub(crate) fn new(transport: Arc<dyn Transport>, name: impl Into<String>) -> Self {
        let name = name.into();
        let base_path = format!("/collections/{name}");
        Self {
            transport,
            name,
            base_path,
        }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn post(
        &self,
        suffix: &str,
        body: serde_json::Value,
    ) -> ClientResult<serde_json::Value> {
        self.transport
            .execute(Method::Post, &format!("{}{suffix}", self.base_path), Some(&body))
            .await
    }

    /// Insert a single document; returns the new document id.
    pub async fn insert_one(&self, document: serde_json::Value) -> ClientResult<String> {
        let result = self.post("/insert", json!({"document": document})).await?;
        Ok(str_field(&result, "id"))
    }

    /// Insert multiple documents; returns the new document ids.
    pub async fn insert_many(&self, documents: Vec<serde_json::Value>) -> ClientResult<Vec<String>> {
        let result = self
            .post("/insert-many", json!({"documents": documents}))
            .await?;
        Ok(str_array_field(&result, "ids"))
    }

    /// Find a single document matching the filter.
    pub async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> ClientResult<Option<serde_json::Value>> {
        let mut body = serde_json::Map::new();
        body.insert("filter".to_string(), filter.to_json());
        if let Some(projection) = projection {
            body.insert("projection".to_string(), projection.to_json());
        }
        let result = self
            .post("/find-one", serde_json::Value::Object(body))
            .await?;
        let document = result.get("document").cloned().filter(|v| !v.is_null());
        Ok(document)
    }

    /// Find documents matching the filter.
    pub async fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> ClientResult<Vec<serde_json::Value>> {
        let mut body = serde_json::Map::new();
        body.insert("filter".to_string(), filter.to_json());
        options.apply(&mut body);
        let result = self.post("/find", serde_json::Value::Object(body)).await?;
        Ok(array_field(&result, "documents"))
    }

    /// Count documents matching the filter.
    pub async fn count(&self, filter: &Filter) -> ClientResult<u64> {
        let result = self.post("/count", json!({"filter": filter})).await?;
        Ok(u64_field(&result, "count"))
    }

    /// Update the first document matching the filter; returns whether a
    /// document was modified.
    pub async fn update_one(&self, filter: &Filter, update: &Update) -> ClientResult<bool> {
        let result = self
            .post("/update-one", json!({"filter": filter, "update": update}))
            .await?;
        Ok(u64_field(&result, "modified") > 0)
    }

    /// Update every document matching the filter; returns the number of
    /// modified documents.
    pub async fn update_many(&self, filter: &Filter, update: &Update) -> ClientResult<u64> {
        let result = self
            .post("/update-many", json!({"filter": filter, "update": update}))
            .await?;
        Ok(u64_field(&result, "modified"))
    }

    /// Delete the first document matching the filter; returns whether a
    /// document was deleted.
    pub async fn delete_one(&self, filter: &Filter) -> ClientResult<bool> {
        let result = self.post("/delete-one", json!({"filter": filter})).await?;
        Ok(u64_field(&result, "deleted") > 0)
    }

    /// Delete every document matching the filter; returns the number of
    /// deleted documents.
    pub async fn delete_many(&self, filter: &Filter) -> ClientResult<u64> {
        let result = self.post("/delete-many", json!({"filter": filter})).await?;
        Ok(u64_field(&result, "deleted"))
    }

    /// Execute an aggregation pipeline. Stage order is transmitted exactly
    /// as composed.
    pub async fn aggregate(&self, pipeline: &Pipeline) -> ClientResult<Vec<serde_json::Value>> {
        let result = self.post("/aggregate", json!({"pipeline": pipeline})).await?;
        Ok(array_field(&result, "documents"))
    }

    /// Get collection statistics.
    pub async fn stats(&self) -> ClientResult<serde_json::Value> {
        self.transport
            .execute(Method::Get, &format!("{}/stats", self.base_path), None)
            .await
    }

    /// Create a B+ tree index on one field.
    pub async fn create_index(&self, field: &str, options: &IndexOptions) -> ClientResult<()> {
        let mut body = serde_json::Map::new();
        body.insert("field".to_string(), json!(field));
        body.insert("unique".to_string(), json!(options.unique));
        body.insert("sparse".to_string(), json!(options.sparse));
        if let Some(name) = &options.name {
            body.insert("name".to_string(), json!(name));
        }
        self.post("/indexes", serde_json::Value::Object(body)).await?;
        Ok(())
    }

    /// Create a compound index over multiple fields.
    pub async fn create_compound_index(
        &self,
        fields: &[&str],
        unique: bool,
        name: Option<&str>,
    ) -> ClientResult<()> {
        let mut body = serde_json::Map::new();
        body.insert("fields".to_string(), json!(fields));
        body.insert("unique".to_string(), json!(unique));
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        self.post("/indexes/compound", serde_json::Value::Object(body))
            .await?;
        Ok(())
    }

    /// Create a full-text index over the given fields.
    pub async fn create_text_index(&self, fields: &[&str], name: Option<&str>) -> ClientResult<()> {
        let mut body = serde_json::Map::new();
        body.insert("fields".to_string(), json!(fields));
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        self.post("/indexes/text", serde_json::Value::Object(body))
            .await?;
        Ok(())
    }

    /// Create a geospatial index on a coordinate field.
    pub async fn create_geo_index(
        &self,
        field: &str,
        geo_type: GeoType,
        name: Option<&str>,
    ) -> ClientResult<()> {
        let mut body = serde_json::Map::new();
        body.insert("field".to_string(), json!(field));
        body.insert("geoType".to_string(), json!(geo_type.wire_name()));
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        self.post("/indexes/geo", serde_json::Value::Object(body))
            .await?;
        Ok(())
    }

    /// Create a TTL index expiring documents after the given number of
    /// seconds.
    pub async fn create_ttl_index(
        &self,
        field: &str,
        expire_after_seconds: u64,
        name: Option<&str>,
    ) -> ClientResult<()> {
        let mut body = serde_json::Map::new();
        body.insert("field".to_string(), json!(field));
        body.insert("expireAfterSeconds".to_string(), json!(expire_after_seconds));
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        self.post("/indexes/ttl", serde_json::Value::Object(body))
            .await?;
        Ok(())
    }

    /// Create a partial index covering only documents that match the filter.
    pub async fn create_partial_index(
        &self,
        field: &str,
        filter: &Filter,
        unique: bool,
        name: Option<&str>,
    ) -> ClientResult<()> {
        let mut body = serde_json::Map::new();
        body.insert("field".to_string(), json!(field));
        body.insert("filterExpression".to_string(), filter.to_json());
        body.insert("unique".to_string(), json!(unique));
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        self.post("/indexes/partial", serde_json::Value::Object(body))
            .await?;
        Ok(())
    }

    /// List all indexes on this collection.
    pub async fn list_indexes(&self) -> ClientResult<Vec<serde_json::Value>> {
        let result = self
            .transport
            .execute(Method::Get, &format!("{}/indexes", self.base_path), None)
            .await?;
        Ok(array_field(&result, "indexes"))
    }

    /// Drop an index by name.
    pub async fn drop_index(&self, name: &str) -> ClientResult<()> {
        self.transport
            .execute(
                Method::Delete,
                &format!("{}/indexes/{name}", self.base_path),
                None,
            )
            .await?;
        Ok(())
    }
}

fn str_field(result: &serde_json::Value, key: &str) -> String {
    result
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn str_array_field(result: &serde_json::Value, key: &str) -> Vec<String> {
    result
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn array_field(result: &serde_json::Value, key: &str) -> Vec<serde_json::Value> {
    result
        .get(key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

fn u64_field(result: &serde_json::Value, key: &str) -> u64 {
    result.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}
