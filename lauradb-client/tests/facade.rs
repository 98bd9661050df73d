//! Facade tests against in-memory transports: request body shapes, result
//! unwrapping defaults, and error classification end to end.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lauradb_client::{
    ClientError, ClientResult, FindOptions, GeoType, IndexOptions, LauraClient, Method, Projection,
    Transport,
};
use lauradb_query::{acc, Filter, GroupKey, Order, Pipeline, Stage, Update};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records every call and replays a queue of canned responses.
struct RecordingTransport {
    calls: Mutex<Vec<(Method, String, Option<serde_json::Value>)>>,
    responses: Mutex<VecDeque<ClientResult<serde_json::Value>>>,
}

impl RecordingTransport {
    fn new(responses: Vec<ClientResult<serde_json::Value>>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().collect()),
        })
    }

    fn calls(&self) -> Vec<(Method, String, Option<serde_json::Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .push((method, path.to_string(), body.cloned()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(serde_json::Value::Null))
    }
}

fn client_with(transport: Arc<RecordingTransport>) -> LauraClient {
    LauraClient::with_transport(transport)
}

#[tokio::test]
async fn test_find_omits_unset_options() {
    init_tracing();
    let transport = RecordingTransport::new(vec![Ok(json!({"documents": []}))]);
    let client = client_with(Arc::clone(&transport));

    client
        .collection("users")
        .find(&Filter::eq("name", "ada"), &FindOptions::new())
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let (method, path, body) = &calls[0];
    assert_eq!(*method, Method::Post);
    assert_eq!(path, "/collections/users/find");
    assert_eq!(
        body.as_ref().unwrap(),
        &json!({"filter": {"name": {"$eq": "ada"}}})
    );
}

#[tokio::test]
async fn test_find_sends_all_options() {
    let transport = RecordingTransport::new(vec![Ok(json!({"documents": [{"name": "ada"}]}))]);
    let client = client_with(Arc::clone(&transport));

    let options = FindOptions::new()
        .projection(Projection::include(["name"]))
        .sort([("age", Order::Desc), ("name", Order::Asc)])
        .skip(10)
        .limit(5);
    let docs = client
        .collection("users")
        .find(&Filter::empty(), &options)
        .await
        .unwrap();
    assert_eq!(docs, vec![json!({"name": "ada"})]);

    let (_, _, body) = &transport.calls()[0];
    assert_eq!(
        body.as_ref().unwrap(),
        &json!({
            "filter": {},
            "projection": {"name": 1},
            "sort": {"age": -1, "name": 1},
            "skip": 10,
            "limit": 5,
        })
    );
}

#[tokio::test]
async fn test_insert_one_returns_id() {
    let transport = RecordingTransport::new(vec![Ok(json!({"id": "doc-1"}))]);
    let client = client_with(Arc::clone(&transport));

    let id = client
        .collection("users")
        .insert_one(json!({"name": "ada"}))
        .await
        .unwrap();
    assert_eq!(id, "doc-1");

    let (_, path, body) = &transport.calls()[0];
    assert_eq!(path, "/collections/users/insert");
    assert_eq!(
        body.as_ref().unwrap(),
        &json!({"document": {"name": "ada"}})
    );
}

#[tokio::test]
async fn test_update_one_modified_flag() {
    let transport = RecordingTransport::new(vec![
        Ok(json!({"modified": 1})),
        Ok(json!({"modified": 0})),
    ]);
    let client = client_with(Arc::clone(&transport));
    let users = client.collection("users");

    let filter = Filter::eq("name", "ada");
    let update = Update::set("age", 37);
    assert!(users.update_one(&filter, &update).await.unwrap());
    assert!(!users.update_one(&filter, &update).await.unwrap());

    let (_, path, body) = &transport.calls()[0];
    assert_eq!(path, "/collections/users/update-one");
    assert_eq!(
        body.as_ref().unwrap(),
        &json!({
            "filter": {"name": {"$eq": "ada"}},
            "update": {"$set": {"age": 37}},
        })
    );
}

#[tokio::test]
async fn test_aggregate_sends_pipeline_in_order() {
    let transport = RecordingTransport::new(vec![Ok(json!({"documents": []}))]);
    let client = client_with(Arc::clone(&transport));

    let pipeline = Pipeline::new()
        .stage(Stage::match_(Filter::gte("age", 21)))
        .stage(
            Stage::group(GroupKey::field("city"), [("total", acc::count())]).unwrap(),
        )
        .stage(Stage::sort([("total", Order::Desc)]))
        .stage(Stage::limit(3));
    client
        .collection("users")
        .aggregate(&pipeline)
        .await
        .unwrap();

    let (_, path, body) = &transport.calls()[0];
    assert_eq!(path, "/collections/users/aggregate");
    assert_eq!(
        body.as_ref().unwrap(),
        &json!({
            "pipeline": [
                {"$match": {"age": {"$gte": 21}}},
                {"$group": {"_id": "$city", "total": {"$count": {}}}},
                {"$sort": {"total": -1}},
                {"$limit": 3},
            ],
        })
    );
}

#[tokio::test]
async fn test_index_operations_paths_and_bodies() {
    let transport = RecordingTransport::new(vec![
        Ok(serde_json::Value::Null),
        Ok(serde_json::Value::Null),
        Ok(serde_json::Value::Null),
        Ok(serde_json::Value::Null),
        Ok(json!({"indexes": [{"name": "age_idx"}]})),
        Ok(serde_json::Value::Null),
    ]);
    let client = client_with(Arc::clone(&transport));
    let users = client.collection("users");

    users
        .create_index(
            "age",
            &IndexOptions {
                unique: false,
                sparse: true,
                name: Some("age_idx".to_string()),
            },
        )
        .await
        .unwrap();
    users
        .create_compound_index(&["city", "age"], true, None)
        .await
        .unwrap();
    users
        .create_geo_index("location", GeoType::Sphere2d, None)
        .await
        .unwrap();
    users.create_ttl_index("created_at", 3600, None).await.unwrap();
    let indexes = users.list_indexes().await.unwrap();
    assert_eq!(indexes, vec![json!({"name": "age_idx"})]);
    users.drop_index("age_idx").await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].1, "/collections/users/indexes");
    assert_eq!(
        calls[0].2.as_ref().unwrap(),
        &json!({"field": "age", "unique": false, "sparse": true, "name": "age_idx"})
    );
    assert_eq!(calls[1].1, "/collections/users/indexes/compound");
    assert_eq!(
        calls[1].2.as_ref().unwrap(),
        &json!({"fields": ["city", "age"], "unique": true})
    );
    assert_eq!(calls[2].1, "/collections/users/indexes/geo");
    assert_eq!(
        calls[2].2.as_ref().unwrap(),
        &json!({"field": "location", "geoType": "2dsphere"})
    );
    assert_eq!(calls[3].1, "/collections/users/indexes/ttl");
    assert_eq!(
        calls[3].2.as_ref().unwrap(),
        &json!({"field": "created_at", "expireAfterSeconds": 3600})
    );
    assert_eq!(calls[4].0, Method::Get);
    assert_eq!(calls[4].1, "/collections/users/indexes");
    assert_eq!(calls[5].0, Method::Delete);
    assert_eq!(calls[5].1, "/collections/users/indexes/age_idx");
}

#[tokio::test]
async fn test_api_error_propagates_through_facade() {
    let transport =
        RecordingTransport::new(vec![Err(ClientError::api("collection does not exist"))]);
    let client = client_with(transport);

    let err = client
        .collection("missing")
        .count(&Filter::empty())
        .await
        .unwrap_err();
    assert!(err.is_api());
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_ping_swallows_transport_errors() {
    let down = RecordingTransport::new(vec![Err(ClientError::transport("connection refused"))]);
    let up = RecordingTransport::new(vec![Ok(json!({"status": "ok"}))]);

    assert!(!client_with(down).ping().await);
    assert!(client_with(up).ping().await);
}

/// A mock server holding real documents, enough to run a CRUD scenario.
struct StatefulMock {
    ages: Mutex<Vec<i64>>,
}

impl StatefulMock {
    fn matches(filter: &serde_json::Value, age: i64) -> bool {
        if filter.as_object().is_some_and(|m| m.is_empty()) {
            return true;
        }
        filter
            .get("age")
            .and_then(|cond| cond.get("$gte"))
            .and_then(|v| v.as_i64())
            .is_some_and(|bound| age >= bound)
    }
}

#[async_trait]
impl Transport for StatefulMock {
    async fn execute(
        &self,
        _method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        let filter = body
            .and_then(|b| b.get("filter"))
            .cloned()
            .unwrap_or_else(|| json!({}));
        let mut ages = self.ages.lock().unwrap();
        if path.ends_with("/insert") {
            let age = body
                .and_then(|b| b.get("document"))
                .and_then(|d| d.get("age"))
                .and_then(|v| v.as_i64())
                .ok_or_else(|| ClientError::api("document has no age"))?;
            ages.push(age);
            Ok(json!({"id": format!("doc-{}", ages.len())}))
        } else if path.ends_with("/count") {
            let count = ages.iter().filter(|&&a| Self::matches(&filter, a)).count();
            Ok(json!({"count": count}))
        } else if path.ends_with("/delete-many") {
            let before = ages.len();
            ages.retain(|&a| !Self::matches(&filter, a));
            Ok(json!({"deleted": before - ages.len()}))
        } else {
            Err(ClientError::api(format!("unsupported path {path}")))
        }
    }
}

#[tokio::test]
async fn test_crud_scenario_against_stateful_mock() {
    init_tracing();
    let client = LauraClient::with_transport(Arc::new(StatefulMock {
        ages: Mutex::new(Vec::new()),
    }));
    let users = client.collection("users");

    for age in [25, 30, 35] {
        let id = users.insert_one(json!({"age": age})).await.unwrap();
        assert!(id.starts_with("doc-"));
    }
    assert_eq!(users.count(&Filter::empty()).await.unwrap(), 3);

    let deleted = users.delete_many(&Filter::gte("age", 30)).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(users.count(&Filter::empty()).await.unwrap(), 1);
}
