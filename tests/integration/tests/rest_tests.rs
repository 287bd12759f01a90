//! End-to-end tests for the REST dispatcher against a scripted mock API

use integration_tests::{exhausted_bucket_headers, MockApi, ScriptedResponse};
use parley_common::ClientConfig;
use parley_core::Snowflake;
use parley_rest::{Attachment, Method, Request, ResponseBody, RestDispatcher, RestError, Route};
use serde_json::json;
use std::time::Duration;

fn dispatcher_for(api: &MockApi) -> RestDispatcher {
    let config = ClientConfig::new("test-token")
        .with_api_url(api.base_url())
        .with_rest_request_timeout(Duration::from_secs(5));
    RestDispatcher::new(&config)
}

#[tokio::test]
async fn test_json_response_resolves_parsed() {
    let api = MockApi::start().await.unwrap();
    api.push(ScriptedResponse::json(json!({"id": "80351110224678912"})));
    let rest = dispatcher_for(&api);

    let body = rest
        .submit(Request::get(Route::user(Snowflake::new(80_351_110_224_678_912))))
        .await
        .unwrap();

    assert_eq!(body.into_json().unwrap()["id"], "80351110224678912");

    // The request carried the credential and hit the resolved path
    let requests = api.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/users/80351110224678912");
}

#[tokio::test]
async fn test_no_content_resolves_empty() {
    let api = MockApi::start().await.unwrap();
    api.push(ScriptedResponse::status(204));
    let rest = dispatcher_for(&api);

    let body = rest
        .submit(Request::new(
            Method::DELETE,
            Route::channel_message(Snowflake::new(1), Snowflake::new(2)),
        ))
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Empty);
}

#[tokio::test]
async fn test_api_error_carries_status_and_body() {
    let api = MockApi::start().await.unwrap();
    api.push(
        ScriptedResponse::status(403).with_body(json!({"message": "Missing Access"})),
    );
    let rest = dispatcher_for(&api);

    let err = rest
        .submit(Request::get(Route::guild(Snowflake::new(41))))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(err.api_body_text().unwrap().contains("Missing Access"));
}

#[tokio::test]
async fn test_timeout_surfaces_as_typed_error() {
    let api = MockApi::start().await.unwrap();
    api.push(ScriptedResponse::json(json!({})).with_delay(Duration::from_millis(600)));

    let config = ClientConfig::new("test-token")
        .with_api_url(api.base_url())
        .with_rest_request_timeout(Duration::from_millis(100));
    let rest = RestDispatcher::new(&config);

    let err = rest
        .submit(Request::get(Route::current_user()))
        .await
        .unwrap_err();
    assert!(matches!(err, RestError::Timeout { .. }));
}

#[tokio::test]
async fn test_exhausted_bucket_delays_next_request() {
    let api = MockApi::start().await.unwrap();
    // First response exhausts the bucket for 600ms
    let mut first = ScriptedResponse::json(json!({"id": "1"}));
    for (name, value) in exhausted_bucket_headers(0.6) {
        first = first.with_header(&name, &value);
    }
    api.push(first);
    api.push(ScriptedResponse::json(json!({"id": "2"})));
    let rest = dispatcher_for(&api);

    let channel = Snowflake::new(81_384_788_765_712_384);
    rest.submit(
        Request::new(Method::POST, Route::channel_messages(channel))
            .with_body(json!({"content": "one"})),
    )
    .await
    .unwrap();
    rest.submit(
        Request::new(Method::POST, Route::channel_messages(channel))
            .with_body(json!({"content": "two"})),
    )
    .await
    .unwrap();

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    let gap = requests[1].at.duration_since(requests[0].at);
    assert!(
        gap >= Duration::from_millis(550),
        "second request fired after {gap:?}, before the bucket reset"
    );
}

#[tokio::test]
async fn test_429_retries_same_request_exactly_once() {
    let api = MockApi::start().await.unwrap();
    api.push(
        ScriptedResponse::status(429)
            .with_body(json!({"message": "You are being rate limited."}))
            .with_header("retry-after", "0.5"),
    );
    api.push(ScriptedResponse::json(json!({"id": "1"})));
    let rest = dispatcher_for(&api);

    let body = rest
        .submit(
            Request::new(Method::POST, Route::channel_messages(Snowflake::new(1)))
                .with_body(json!({"content": "hello"})),
        )
        .await
        .unwrap();

    // One resolution, one retry, no duplicates
    assert_eq!(body.into_json().unwrap()["id"], "1");
    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    let gap = requests[1].at.duration_since(requests[0].at);
    assert!(
        gap >= Duration::from_millis(450),
        "retry fired after {gap:?}, before the server-specified delay"
    );
}

#[tokio::test]
async fn test_global_throttle_gates_the_queue() {
    let api = MockApi::start().await.unwrap();
    api.push(
        ScriptedResponse::json(json!({}))
            .with_header("x-ratelimit-global", "true")
            .with_header("retry-after", "0.5"),
    );
    api.push(ScriptedResponse::json(json!({})));
    let rest = dispatcher_for(&api);

    // Unrelated routes: only the global flag links them
    rest.submit(Request::get(Route::current_user())).await.unwrap();
    rest.submit(Request::get(Route::gateway())).await.unwrap();

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    let gap = requests[1].at.duration_since(requests[0].at);
    assert!(
        gap >= Duration::from_millis(450),
        "request fired after {gap:?}, during the global throttle window"
    );
}

#[tokio::test]
async fn test_requests_start_in_submission_order() {
    let api = MockApi::start().await.unwrap();
    let rest = dispatcher_for(&api);

    let (a, b, c) = tokio::join!(
        rest.submit(Request::get(Route::user(Snowflake::new(1)))),
        rest.submit(Request::get(Route::user(Snowflake::new(2)))),
        rest.submit(Request::get(Route::user(Snowflake::new(3)))),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let paths: Vec<_> = api.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/users/1", "/users/2", "/users/3"]);
}

#[tokio::test]
async fn test_attachments_switch_to_multipart() {
    let api = MockApi::start().await.unwrap();
    let rest = dispatcher_for(&api);

    rest.submit(
        Request::new(Method::POST, Route::channel_messages(Snowflake::new(1)))
            .with_body(json!({"content": "with file"}))
            .with_attachment(Attachment::new("report.txt", b"file body".to_vec())),
    )
    .await
    .unwrap();

    let requests = api.requests();
    let content_type = requests[0].content_type.as_deref().unwrap();
    assert!(
        content_type.starts_with("multipart/form-data"),
        "unexpected content type: {content_type}"
    );

    // The multipart body carries the structured payload and the file part
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("payload_json"));
    assert!(body.contains("with file"));
    assert!(body.contains("files[0]"));
    assert!(body.contains("report.txt"));
    assert!(body.contains("file body"));
}

#[tokio::test]
async fn test_json_body_without_attachments_stays_json() {
    let api = MockApi::start().await.unwrap();
    let rest = dispatcher_for(&api);

    rest.submit(
        Request::new(Method::POST, Route::channel_messages(Snowflake::new(1)))
            .with_body(json!({"content": "plain"})),
    )
    .await
    .unwrap();

    let requests = api.requests();
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&requests[0].body).unwrap()["content"],
        "plain"
    );
}
