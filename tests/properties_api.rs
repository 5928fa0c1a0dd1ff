//! End-to-end behaviour of the `/properties` API over the in-memory store.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use zk_properties::api;
use zk_properties::api::response::JSON_CONTENT_TYPE;
use zk_properties::app_state::AppState;
use zk_properties::domain::{PropertySet, PropertySetName};
use zk_properties::error::StorageError;
use zk_properties::service::PropertyService;
use zk_properties::storage::{MemoryStorageFactory, PropertiesStorage, StorageFactory};

struct TestApp {
    app: Router,
    factory: MemoryStorageFactory,
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        let Ok(value) = serde_json::from_slice(&self.body) else {
            panic!("body is not JSON: {:?}", String::from_utf8_lossy(&self.body));
        };
        value
    }

    fn message(&self) -> String {
        match self.json().get("message") {
            Some(Value::String(message)) => message.clone(),
            other => panic!("no message in error body: {other:?}"),
        }
    }
}

fn test_app() -> TestApp {
    test_app_with(
        |factory| Arc::new(factory) as Arc<dyn StorageFactory>,
        Duration::from_secs(5),
    )
}

/// Serves the app over `wrap(memory)`; the returned app keeps the memory
/// factory for its session counters.
fn test_app_with(
    wrap: impl FnOnce(MemoryStorageFactory) -> Arc<dyn StorageFactory>,
    request_timeout: Duration,
) -> TestApp {
    let factory = MemoryStorageFactory::new();
    let state = AppState::new(PropertyService::new(wrap(factory.clone())));
    TestApp {
        app: api::build_app(state, request_timeout),
        factory,
    }
}

/// Opens sessions only after `delay`.
#[derive(Debug)]
struct SlowFactory {
    inner: MemoryStorageFactory,
    delay: Duration,
}

impl StorageFactory for SlowFactory {
    fn create(&self) -> Result<Box<dyn PropertiesStorage>, StorageError> {
        std::thread::sleep(self.delay);
        self.inner.create()
    }
}

/// Hands out sessions whose `get` panics.
#[derive(Debug)]
struct PanickingFactory {
    inner: MemoryStorageFactory,
}

impl StorageFactory for PanickingFactory {
    fn create(&self) -> Result<Box<dyn PropertiesStorage>, StorageError> {
        let inner = self.inner.create()?;
        Ok(Box::new(PanickingSession { inner }))
    }
}

#[derive(Debug)]
struct PanickingSession {
    inner: Box<dyn PropertiesStorage>,
}

impl PropertiesStorage for PanickingSession {
    fn get(&self, _name: &PropertySetName) -> Result<Option<PropertySet>, StorageError> {
        panic!("session lost its mind");
    }

    fn store(&self, set: &PropertySet) -> Result<(), StorageError> {
        self.inner.store(set)
    }

    fn delete(&self, name: &PropertySetName) -> Result<(), StorageError> {
        self.inner.delete(name)
    }

    fn property_sets(&self) -> Result<Vec<String>, StorageError> {
        self.inner.property_sets()
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        self.inner.close()
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<&str>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let Ok(request) = builder.body(body) else {
            panic!("valid request");
        };

        let Ok(response) = self.app.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let Ok(body) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("readable body");
        };
        Reply {
            status,
            content_type,
            body: body.to_vec(),
        }
    }

    async fn get(&self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None).await
    }

    async fn put(&self, uri: &str, body: &str) -> Reply {
        self.send(Method::PUT, uri, Some(body)).await
    }

    async fn post(&self, uri: &str, body: &str) -> Reply {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> Reply {
        self.send(Method::DELETE, uri, None).await
    }

    fn assert_sessions_released(&self) {
        assert_eq!(self.factory.opened(), self.factory.closed());
    }
}

fn sorted_names(reply: &Reply) -> Vec<String> {
    let Value::Array(items) = reply.json() else {
        panic!("expected a JSON array");
    };
    let mut names: Vec<String> = items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => name,
            other => panic!("non-string name {other}"),
        })
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn put_then_get_returns_entries() {
    let app = test_app();

    let reply = app.put("/properties/db", r#"{"host":"h1","port":"5432"}"#).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert!(reply.body.is_empty());

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    assert_eq!(reply.json(), json!({"host": "h1", "port": "5432"}));
    app.assert_sessions_released();
}

#[tokio::test]
async fn post_merges_into_existing_set() {
    let app = test_app();
    app.put("/properties/db", r#"{"host":"h1","port":"5432"}"#).await;

    let reply = app.post("/properties/db", r#"{"port":"6543","user":"u"}"#).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert!(reply.body.is_empty());

    let reply = app.get("/properties/db").await;
    assert_eq!(
        reply.json(),
        json!({"host": "h1", "port": "6543", "user": "u"})
    );
    app.assert_sessions_released();
}

#[tokio::test]
async fn put_replaces_whole_set() {
    let app = test_app();
    app.put("/properties/db", r#"{"host":"h1","port":"5432"}"#).await;

    let reply = app.put("/properties/db", r#"{"user":"u"}"#).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.json(), json!({"user": "u"}));
}

#[tokio::test]
async fn repeated_put_is_idempotent() {
    let app = test_app();
    let body = r#"{"a":"1","b":"2"}"#;
    app.put("/properties/cfg", body).await;
    app.put("/properties/cfg", body).await;

    let reply = app.get("/properties/cfg").await;
    assert_eq!(reply.json(), json!({"a": "1", "b": "2"}));
}

#[tokio::test]
async fn post_to_missing_set_creates_it() {
    let app = test_app();
    let reply = app.post("/properties/new", r#"{"k":"v"}"#).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = app.get("/properties/new").await;
    assert_eq!(reply.json(), json!({"k": "v"}));
}

#[tokio::test]
async fn missing_set_is_not_found() {
    let app = test_app();
    let reply = app.get("/properties/missing").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    assert_eq!(reply.json(), json!({"message": "No such property set"}));
}

#[tokio::test]
async fn array_body_is_rejected_without_storing() {
    let app = test_app();
    let reply = app.put("/properties/x", "[1,2,3]").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(!reply.message().is_empty());

    let reply = app.get("/properties/x").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_bodies_leave_stored_set_untouched() {
    let app = test_app();
    app.put("/properties/db", r#"{"host":"h1"}"#).await;

    for body in [
        r#"{"port":5432}"#,
        r#"{"on":true}"#,
        r#"{"nested":{"a":"b"}}"#,
        r#"{"list":["a"]}"#,
        r#""just a string""#,
        "{not json",
        "",
    ] {
        let reply = app.put("/properties/db", body).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "PUT {body:?}");
        let reply = app.post("/properties/db", body).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "POST {body:?}");
    }

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.json(), json!({"host": "h1"}));
    app.assert_sessions_released();
}

#[tokio::test]
async fn rejected_body_opens_no_session() {
    let app = test_app();
    app.put("/properties/db", r#"{"port":5432}"#).await;
    assert_eq!(app.factory.opened(), 0);
}

#[tokio::test]
async fn list_returns_exactly_stored_names() {
    let app = test_app();
    app.put("/properties/a", "{}").await;
    app.put("/properties/b", r#"{"k":"v"}"#).await;

    let reply = app.get("/properties/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    assert_eq!(sorted_names(&reply), vec!["a", "b"]);

    let reply = app.get("/properties").await;
    assert_eq!(sorted_names(&reply), vec!["a", "b"]);
}

#[tokio::test]
async fn list_of_empty_store_is_empty_array() {
    let app = test_app();
    let reply = app.get("/properties/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!([]));
}

#[tokio::test]
async fn empty_set_round_trips() {
    let app = test_app();
    app.put("/properties/a", "{}").await;
    let reply = app.get("/properties/a").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({}));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = test_app();
    app.put("/properties/a", "{}").await;

    let reply = app.delete("/properties/a").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.is_empty());

    let reply = app.delete("/properties/a").await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = app.get("/properties/a").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    app.assert_sessions_released();
}

#[tokio::test]
async fn mutations_without_name_are_bad_requests() {
    let app = test_app();
    for uri in ["/properties/", "/properties"] {
        for reply in [
            app.put(uri, r#"{"k":"v"}"#).await,
            app.post(uri, r#"{"k":"v"}"#).await,
            app.delete(uri).await,
        ] {
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(reply.message(), "Missing property-set name");
        }
    }
    assert_eq!(app.factory.opened(), 0);
}

#[tokio::test]
async fn nested_names_are_rejected() {
    let app = test_app();
    let reply = app.put("/properties/a/b", r#"{"k":"v"}"#).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.put("/properties/a%2Fb", r#"{"k":"v"}"#).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.get("/properties/a/b").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.get("/properties/").await;
    assert_eq!(reply.json(), json!([]));
}

#[tokio::test]
async fn percent_encoded_names_are_decoded() {
    let app = test_app();
    app.put("/properties/my%20app", r#"{"k":"v"}"#).await;

    let reply = app.get("/properties/").await;
    assert_eq!(sorted_names(&reply), vec!["my app"]);
}

#[tokio::test]
async fn storage_failures_are_server_errors() {
    let app = test_app();
    app.put("/properties/db", r#"{"k":"v"}"#).await;
    app.factory.set_failing(true);

    for reply in [
        app.get("/properties/").await,
        app.get("/properties/db").await,
        app.put("/properties/db", r#"{"k":"v"}"#).await,
        app.post("/properties/db", r#"{"k":"v"}"#).await,
        app.delete("/properties/db").await,
    ] {
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
        assert!(reply.message().starts_with("Storage failure"));
    }
    app.assert_sessions_released();
}

#[tokio::test]
async fn unreachable_store_is_server_error() {
    let app = test_app();
    app.factory.set_unreachable(true);

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.message().contains("unable to connect"));
    assert_eq!(app.factory.opened(), 0);
}

#[tokio::test]
async fn corrupt_node_is_server_error() {
    let app = test_app();
    assert!(app.factory.insert_raw("broken", b"{\"n\":1}").is_ok());

    let reply = app.get("/properties/broken").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);

    let reply = app.post("/properties/broken", r#"{"k":"v"}"#).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    app.assert_sessions_released();
}

#[tokio::test]
async fn slow_requests_time_out_with_json() {
    let app = test_app_with(
        |inner| {
            Arc::new(SlowFactory {
                inner,
                delay: Duration::from_millis(300),
            }) as Arc<dyn StorageFactory>
        },
        Duration::from_millis(50),
    );

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    assert_eq!(reply.message(), "Request timed out");

    // The worker still runs to completion and releases its session.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(app.factory.opened(), 1);
    app.assert_sessions_released();
}

#[tokio::test]
async fn worker_panic_is_server_error_and_releases_session() {
    let app = test_app_with(
        |inner| Arc::new(PanickingFactory { inner }) as Arc<dyn StorageFactory>,
        Duration::from_secs(5),
    );

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    let message = reply.message();
    assert!(message.starts_with("Storage failure"));
    assert!(!message.contains("lost its mind"));
    assert_eq!(app.factory.opened(), 1);
    app.assert_sessions_released();
}

#[tokio::test]
async fn close_failures_do_not_change_outcome() {
    let app = test_app();
    app.factory.set_failing_close(true);

    let reply = app.put("/properties/db", r#"{"k":"v"}"#).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = app.get("/properties/db").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"k": "v"}));
    app.assert_sessions_released();
}

#[tokio::test]
async fn every_request_releases_its_sessions() {
    let app = test_app();
    app.put("/properties/a", r#"{"k":"v"}"#).await;
    app.post("/properties/a", r#"{"k2":"v2"}"#).await;
    app.put("/properties/b", "[1]").await;
    app.get("/properties/a").await;
    app.get("/properties/nope").await;
    app.get("/properties/").await;
    app.factory.set_failing(true);
    app.post("/properties/a", r#"{"k3":"v3"}"#).await;
    app.factory.set_failing(false);
    app.delete("/properties/a").await;
    app.delete("/properties/").await;

    assert_eq!(app.factory.opened(), 8);
    app.assert_sessions_released();
}

#[tokio::test]
async fn unknown_routes_answer_with_json() {
    let app = test_app();
    let reply = app.get("/nothing-here").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    assert_eq!(reply.message(), "Not found");

    let reply = app.send(Method::PATCH, "/properties/db", Some("{}")).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.message(), "Method not allowed");
}

#[tokio::test]
async fn health_does_not_touch_storage() {
    let app = test_app();
    let reply = app.get("/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json().get("status"), Some(&json!("healthy")));
    assert_eq!(app.factory.opened(), 0);
}

#[tokio::test]
async fn serves_openapi_document() {
    let app = test_app();
    let reply = app.get("/api-docs/openapi.json").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    assert!(reply.json().get("paths").is_some());
}
