//! End-to-end dispatch against a mock upstream.

use connectlib::error::DispatchError;
use connectlib::ledger::LedgerStatus;
use connectlib::routes::{Method, RouteRequest};
use connectlib::ConnectError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{engine_for, write_route_file};

#[tokio::test]
async fn get_resolves_with_parsed_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/info/version"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": {"version": "1.0"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &format!("{}/api", server.uri()), &[("info", "/info/version")]);
    let engine = engine_for(dir.path());

    let handle = engine.request(RouteRequest::new(Method::Get, "INFO")).unwrap();
    let id = handle.id();
    let envelope = handle.await.unwrap();

    assert_eq!(envelope.status_code(), 200);
    assert_eq!(envelope.data("code"), Some(&json!(200)));
    assert_eq!(envelope.spec_data("data", "version"), Some(&json!("1.0")));

    let entry = engine.ledger().get(id).unwrap();
    assert_eq!(entry.status, LedgerStatus::Success);
    assert_eq!(entry.route, "/info/version");
    assert_eq!(entry.branch, format!("{}/api", server.uri()));
}

#[tokio::test]
async fn query_placeholder_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/greet"))
        .and(query_param("name", "Sandro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "hi Sandro"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("greet", "/greet$name$")]);
    let engine = engine_for(dir.path());

    let envelope = engine
        .call(RouteRequest::new(Method::Get, "greet").query_param("name", "Sandro"))
        .await
        .unwrap();

    assert_eq!(envelope.data("message"), Some(&json!("hi Sandro")));
    assert_eq!(engine.ledger().list()[0].route, "/greet?name=Sandro");
}

#[tokio::test]
async fn versioned_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/users/7/posts"))
        .and(body_json(json!({"title": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 12})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("posts", "/users/{id}/posts")]);
    let engine = engine_for(dir.path());

    let mut body = serde_json::Map::new();
    body.insert("title".to_string(), json!("hello"));
    let envelope = engine
        .call(
            RouteRequest::new(Method::Post, "posts")
                .version("v2")
                .path_param("id", 7)
                .body(body),
        )
        .await
        .unwrap();

    assert_eq!(envelope.status_code(), 201);
    assert_eq!(envelope.data("id"), Some(&json!(12)));
}

#[tokio::test]
async fn put_without_body_sends_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/items/1"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("item", "/items/{id}")]);
    let engine = engine_for(dir.path());

    let envelope = engine
        .call(RouteRequest::new(Method::Put, "item").path_param("id", 1))
        .await
        .unwrap();

    assert_eq!(envelope.status_code(), 204);
    assert!(!envelope.is_parsed());
    assert_eq!(engine.ledger().list()[0].status, LedgerStatus::Success);
}

#[tokio::test]
async fn error_status_resolves_and_marks_ledger_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/items/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("item", "/items/{id}")]);
    let engine = engine_for(dir.path());

    let handle = engine
        .request(RouteRequest::new(Method::Delete, "item").path_param("id", 9))
        .unwrap();
    let id = handle.id();
    let envelope = handle.await.unwrap();

    assert_eq!(envelope.status_code(), 404);
    assert!(!envelope.is_success());
    assert_eq!(envelope.data("error"), Some(&json!("not found")));
    assert_eq!(engine.ledger().get(id).unwrap().status, LedgerStatus::Error);
}

#[tokio::test]
async fn malformed_success_body_rejects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("hello", "/hello")]);
    let engine = engine_for(dir.path());

    let err = engine
        .call(RouteRequest::new(Method::Get, "hello"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectError::Dispatch(DispatchError::MalformedBody { status: 200, .. })
    ));
    assert_eq!(engine.ledger().list()[0].status, LedgerStatus::Error);
}

#[tokio::test]
async fn unreachable_upstream_rejects_with_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &base, &[("hello", "/hello")]);
    let engine = engine_for(dir.path());

    let err = engine
        .call(RouteRequest::new(Method::Get, "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectError::Dispatch(DispatchError::Transport(_))));
    assert_eq!(engine.ledger().list()[0].status, LedgerStatus::Error);
}

#[tokio::test]
async fn empty_url_path_fails_before_ledger() {
    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), "", &[("hello", "/hello")]);
    let engine = engine_for(dir.path());

    let err = engine
        .request(RouteRequest::new(Method::Get, "hello"))
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectError::Dispatch(DispatchError::MissingBaseUrl { .. })
    ));
    assert!(engine.ledger().is_empty());
}

#[tokio::test]
async fn explicit_base_url_overrides_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), "http://127.0.0.1:1", &[("hello", "/hello")]);
    let engine = engine_for(dir.path());

    let resolved = engine
        .resolve(&RouteRequest::new(Method::Get, "hello"))
        .unwrap();
    let envelope = engine
        .dispatch_with_base(resolved, &server.uri())
        .unwrap()
        .await
        .unwrap();

    assert_eq!(envelope.data("ok"), Some(&json!(true)));
}

#[tokio::test]
async fn concurrent_dispatches_get_distinct_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": true})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("ping", "/ping")]);
    let engine = engine_for(dir.path());

    let handles: Vec<_> = (0..10)
        .map(|_| engine.request(RouteRequest::new(Method::Get, "ping")).unwrap())
        .collect();
    let mut ids: Vec<u64> = handles.iter().map(|h| h.id()).collect();

    for result in futures::future::join_all(handles).await {
        assert!(result.unwrap().is_success());
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    assert_eq!(engine.ledger().counts().success, 10);
}

fn title_body() -> serde_json::Map<String, serde_json::Value> {
    let mut body = serde_json::Map::new();
    body.insert("title".to_string(), json!("ignored"));
    body
}

#[tokio::test]
async fn get_and_delete_never_send_a_body() {
    let server = MockServer::start().await;
    for verb in ["GET", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/items/3"))
            .and(|request: &wiremock::Request| request.body.is_empty())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"verb": verb})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("item", "/items/{id}")]);
    let engine = engine_for(dir.path());

    for verb in [Method::Get, Method::Delete] {
        let envelope = engine
            .call(
                RouteRequest::new(verb, "item")
                    .path_param("id", 3)
                    .body(title_body()),
            )
            .await
            .unwrap();

        assert_eq!(envelope.status_code(), 200);
        assert_eq!(envelope.data("verb"), Some(&json!(verb.as_str())));
    }
}

#[tokio::test]
async fn patch_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/items/4"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"title": "ignored"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"patched": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_route_file(dir.path(), &server.uri(), &[("item", "/items/{id}")]);
    let engine = engine_for(dir.path());

    let envelope = engine
        .call(
            RouteRequest::new(Method::Patch, "item")
                .path_param("id", 4)
                .body(title_body()),
        )
        .await
        .unwrap();

    assert_eq!(envelope.data("patched"), Some(&json!(true)));
    assert_eq!(engine.ledger().list()[0].status, LedgerStatus::Success);
}
