mod common;

use std::time::Duration;

use common::{CaptureSink, MockTransport, Reply};
use http::header::{HeaderMap, HeaderValue, USER_AGENT};
use http::{Method, StatusCode};
use melchett::{
    CORRELATION_ID_HEADER, ErrorName, HttpClient, TransportError, TransportErrorKind,
};
use serde_json::json;

fn client(transport: MockTransport) -> HttpClient {
    HttpClient::builder()
        .name("users")
        .user_agent("melchett-tests/1.0")
        .transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn get_resolves_with_json_body() {
    let transport = MockTransport::new(Reply::json(200, json!({"data": 1})));
    let client = client(transport.clone());

    let settled = client.get("http://upstream/users/1", None).await.unwrap();

    assert_eq!(settled.status(), StatusCode::OK);
    assert_eq!(settled.body(), &json!({"data": 1}));
    assert_eq!(settled.request.client, "users");
    assert_eq!(settled.request.method, Method::GET);
    assert!(!settled.response.cached);
    assert!(settled.response.duration.is_some());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn not_found_is_a_status_error() {
    let transport = MockTransport::new(Reply::json(404, json!({"error": "missing"})));
    let client = client(transport);

    let failure = client.get("http://upstream/users/2", None).await.unwrap_err();

    assert_eq!(failure.error.name, ErrorName::Status(StatusCode::NOT_FOUND));
    assert_eq!(failure.error.name.to_string(), "ESTATUS404");
    assert_eq!(
        failure.error.message,
        "Status code 404 received for http://upstream/users/2"
    );
    assert_eq!(failure.error.details.as_deref(), Some(""));
    assert_eq!(failure.response.unwrap().status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_error_is_a_status_error() {
    let client = client(MockTransport::new(Reply::json(503, json!({}))));

    let failure = client.get("http://upstream/", None).await.unwrap_err();

    assert_eq!(failure.error.name.to_string(), "ESTATUS503");
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let client = client(MockTransport::new(Reply::text(200, "<html></html>")));

    let failure = client.get("http://upstream/", None).await.unwrap_err();

    assert_eq!(failure.error.name, ErrorName::NotJson);
    assert_eq!(failure.error.message, "Response data was not an object");
}

#[tokio::test]
async fn json_scalars_are_rejected() {
    let client = client(MockTransport::new(Reply::json(200, json!("just a string"))));

    let failure = client.get("http://upstream/", None).await.unwrap_err();

    assert_eq!(failure.error.name, ErrorName::NotJson);
}

#[tokio::test]
async fn arrays_are_accepted() {
    let client = client(MockTransport::new(Reply::json(200, json!([1, 2, 3]))));

    let settled = client.get("http://upstream/", None).await.unwrap();

    assert_eq!(settled.body(), &json!([1, 2, 3]));
}

#[tokio::test(start_paused = true)]
async fn slow_transport_times_out() {
    let transport = MockTransport::new(
        Reply::json(200, json!({})).delayed(Duration::from_secs(5)),
    );
    let client = HttpClient::builder()
        .timeout(Duration::from_millis(1500))
        .transport(transport)
        .build()
        .unwrap();

    let failure = client.get("http://upstream/slow", None).await.unwrap_err();

    assert_eq!(failure.error.name, ErrorName::TimedOut);
    assert_eq!(failure.error.message, "Timeout of 1500ms exceeded");
    assert!(failure.response.is_none());
}

#[tokio::test(start_paused = true)]
async fn response_inside_deadline_is_not_cancelled() {
    let transport = MockTransport::new(
        Reply::json(200, json!({})).delayed(Duration::from_millis(1400)),
    );
    let client = HttpClient::builder()
        .timeout(Duration::from_millis(1500))
        .transport(transport.clone())
        .build()
        .unwrap();

    client.get("http://upstream/", None).await.unwrap();

    assert!(!transport.last_request().cancellation().is_cancelled());
}

#[tokio::test]
async fn transport_failure_is_unknown_with_kind_details() {
    let transport = MockTransport::new(Reply::fail(TransportError::new(
        TransportErrorKind::Connect,
        "connection refused",
    )));
    let client = client(transport);

    let failure = client.get("http://upstream/", None).await.unwrap_err();

    assert_eq!(failure.error.name, ErrorName::Unknown);
    assert_eq!(failure.error.message, "connection refused");
    assert_eq!(failure.error.details.as_deref(), Some("ECONNREFUSED"));
    assert!(failure.response.is_none());
}

#[tokio::test]
async fn injects_correlation_id_and_user_agent() {
    let transport = MockTransport::new(Reply::json(200, json!({})));
    let client = client(transport.clone());

    let settled = client.get("http://upstream/", None).await.unwrap();

    let sent = transport.last_request();
    assert_eq!(
        sent.headers().get(CORRELATION_ID_HEADER).unwrap(),
        sent.id().to_string().as_str()
    );
    assert_eq!(sent.headers().get(USER_AGENT).unwrap(), "melchett-tests/1.0");
    assert_eq!(settled.request.id, sent.id());
}

#[tokio::test]
async fn caller_user_agent_wins() {
    let transport = MockTransport::new(Reply::json(200, json!({})));
    let client = client(transport.clone());
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("custom/2.0"));

    client.get("http://upstream/", Some(headers)).await.unwrap();

    assert_eq!(
        transport.last_request().headers().get(USER_AGENT).unwrap(),
        "custom/2.0"
    );
}

#[tokio::test]
async fn every_call_gets_a_fresh_id() {
    let transport = MockTransport::new(Reply::json(200, json!({})));
    let client = client(transport.clone());

    client.get("http://upstream/", None).await.unwrap();
    client.get("http://upstream/", None).await.unwrap();

    let requests = transport.requests();
    assert_ne!(requests[0].id(), requests[1].id());
}

#[tokio::test]
async fn post_and_delete_forward_method_and_body() {
    let transport = MockTransport::new(Reply::json(201, json!({"id": 7})));
    let client = client(transport.clone());

    let created = client
        .post("http://upstream/users", json!({"name": "Kevin"}), None)
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(created.request.body, Some(json!({"name": "Kevin"})));
    let sent = transport.last_request();
    assert_eq!(sent.method(), Method::POST);
    assert_eq!(sent.body(), Some(&json!({"name": "Kevin"})));

    client.delete("http://upstream/users/7", None).await.unwrap();
    let sent = transport.last_request();
    assert_eq!(sent.method(), Method::DELETE);
    assert_eq!(sent.body(), None);
}

#[tokio::test]
async fn custom_success_predicate() {
    let client = HttpClient::builder()
        .success_predicate(|status| status == StatusCode::NOT_FOUND || status.is_success())
        .transport(MockTransport::new(Reply::json(404, json!({"found": false}))))
        .build()
        .unwrap();

    let settled = client.get("http://upstream/", None).await.unwrap();

    assert_eq!(settled.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn timing_header_overrides_wall_clock() {
    let transport = MockTransport::new(
        Reply::json(200, json!({})).header("x-response-time", "42.5"),
    );
    let client = HttpClient::builder()
        .timing_header("X-Response-Time")
        .transport(transport)
        .build()
        .unwrap();

    let settled = client.get("http://upstream/", None).await.unwrap();

    assert_eq!(settled.response.duration, Some(42.5));
}

#[tokio::test]
async fn log_sink_receives_one_record_per_call() {
    let sink = CaptureSink::default();
    let transport = MockTransport::new(
        Reply::json(200, json!({"ok": true})).header("content-length", "11"),
    )
    .then(Reply::json(500, json!({})));
    let client = HttpClient::builder()
        .name("orders")
        .log_sink(sink.clone())
        .transport(transport)
        .build()
        .unwrap();

    client.get("http://upstream/orders", None).await.unwrap_err();
    client.get("http://upstream/orders", None).await.unwrap();

    let errors = sink.error.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_name.as_deref(), Some("ESTATUS500"));
    assert_eq!(errors[0].status_code, Some(500));

    let info = sink.info.lock().unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].client, "orders");
    assert_eq!(info[0].kind, "upstream");
    assert_eq!(info[0].method, "GET");
    assert_eq!(info[0].status_code, Some(200));
    assert_eq!(info[0].content_length.as_deref(), Some("11"));
    assert_eq!(info[0].melchett_cache, Some("MISS"));
    assert!(info[0].upstream_duration.is_some());
}

#[tokio::test]
async fn failure_displays_its_error() {
    let client = client(MockTransport::new(Reply::json(404, json!({}))));

    let failure = client.get("http://upstream/x", None).await.unwrap_err();

    assert_eq!(
        failure.to_string(),
        "ESTATUS404: Status code 404 received for http://upstream/x"
    );
}
