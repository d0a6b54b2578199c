use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use httpmock::prelude::*;
use sdk_transport::{
    ApiCall, AuthSession, BearerTokenSession, Body, HttpMethod, QueryValue, RedirectPolicy,
    ReqwestTransport, RequestProps, SdkResponse, SessionAuthenticator, Transport, TransportError,
    TransportOptions, TransportSettings, Values,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ApiError {
    message: String,
    documentation_url: String,
}

fn transport_for(server: &MockServer) -> ReqwestTransport {
    let settings = TransportSettings::new(server.url("/api/4.0"), "4.0")
        .with_header("X-Default", "default-value");
    ReqwestTransport::new(settings).unwrap()
}

fn error_message<T, E>(resp: &SdkResponse<T, E>) -> String {
    resp.error()
        .and_then(|e| e.as_sdk())
        .map(|e| e.message().to_owned())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_get_json_with_query_params() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/4.0/users")
                .query_param("fields", "id,name")
                .query_param("a", "v 1")
                .query_param("active", "false")
                .query_param("parent", "null")
                .header("X-Default", "default-value")
                .header("user-agent", "sdk-transport/4.0")
                .header("x-sdk-appid", "sdk-transport/4.0");
            then.status(200)
                .header("Content-Type", "application/json; charset=utf-8")
                .json_body(json!([{"id": 1, "name": "Ada"}]));
        })
        .await;

    let transport = transport_for(&server);
    let query = Values::new()
        .with("fields", "id,name")
        .with("a", "v 1")
        .with("active", false)
        .with("parent", QueryValue::Null)
        .with_opt::<i64>("limit", None);

    let resp: SdkResponse<Vec<User>, ApiError> = transport
        .request(ApiCall::new(HttpMethod::Get, "/users").query(query))
        .await;

    assert!(resp.is_ok(), "{resp:?}");
    assert_eq!(
        resp.into_result().unwrap(),
        vec![User {
            id: 1,
            name: "Ada".into()
        }]
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_json_with_bearer_session() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/4.0/users")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .json_body(json!({"name": "Grace"}));
            then.status(201)
                .header("Content-Type", "application/json")
                .json_body(json!({"id": 2, "name": "Grace"}));
        })
        .await;

    let transport = transport_for(&server);
    let session = Arc::new(BearerTokenSession::new("test-token"));
    let auth = SessionAuthenticator::new(Arc::clone(&session));

    let call = ApiCall::new(HttpMethod::Post, "/users")
        .body(Body::from_json(&json!({"name": "Grace"})).unwrap())
        .authenticator(&auth);
    let resp: SdkResponse<User, ApiError> = transport.request(call).await;

    assert_eq!(
        resp.value(),
        Some(&User {
            id: 2,
            name: "Grace".into()
        })
    );
    assert!(session.is_authenticated());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_text_response() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/sql/1/run");
            then.status(200)
                .header("Content-Type", "text/csv; charset=utf-8")
                .body("id,name\n1,Ada\n");
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<String, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/sql/1/run"))
        .await;

    assert_eq!(resp.value().map(String::as_str), Some("id,name\n1,Ada\n"));
}

#[tokio::test]
async fn test_binary_response() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/render/1.png");
            then.status(200)
                .header("Content-Type", "image/png")
                .body(vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff]);
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<Bytes, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/render/1.png"))
        .await;

    assert_eq!(
        resp.into_result().unwrap(),
        Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47, 0x00, 0xff])
    );
}

#[tokio::test]
async fn test_no_content_into_unit() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/4.0/users/1");
            then.status(204);
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<(), ApiError> = transport
        .request(ApiCall::new(HttpMethod::Delete, "/users/1"))
        .await;

    assert!(resp.is_ok(), "{resp:?}");
}

#[tokio::test]
async fn test_api_error_passed_through() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/users/99");
            then.status(404)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "message": "Not found",
                    "documentation_url": "https://docs.example.com"
                }));
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<User, ApiError> = transport
        .request(ApiCall::new(HttpMethod::Get, "/users/99"))
        .await;

    assert!(!resp.is_ok());
    assert!(resp.value().is_none());
    assert_eq!(
        resp.error().and_then(|e| e.as_api()).map(|e| e.message.as_str()),
        Some("Not found")
    );
}

#[tokio::test]
async fn test_untyped_error_body_normalized() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/broken");
            then.status(500)
                .header("Content-Type", "application/json")
                .json_body(json!({"error": {"message": "database unavailable"}}));
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<User, ApiError> = transport
        .request(ApiCall::new(HttpMethod::Get, "/broken"))
        .await;

    assert_eq!(error_message(&resp), "database unavailable");
}

#[tokio::test]
async fn test_plain_text_and_empty_errors_keep_status() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/gateway");
            then.status(502)
                .header("Content-Type", "text/plain")
                .body("upstream down");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/empty");
            then.status(500);
        })
        .await;

    let transport = transport_for(&server);

    let text: SdkResponse<Value, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/gateway"))
        .await;
    assert!(text.error().and_then(|e| e.as_api()).is_none(), "{text:?}");
    assert_eq!(error_message(&text), "502 Bad Gateway: upstream down");

    let empty: SdkResponse<Value, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/empty"))
        .await;
    assert!(empty.error().and_then(|e| e.as_api()).is_none(), "{empty:?}");
    assert_eq!(error_message(&empty), "500 Internal Server Error");
}

#[tokio::test]
async fn test_connection_failure_is_tagged_not_raised() {
    let settings = TransportSettings::new("http://127.0.0.1:1", "4.0");
    let transport = ReqwestTransport::new(settings).unwrap();

    let resp: SdkResponse<Value, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/users"))
        .await;

    assert!(!resp.is_ok());
    assert!(!error_message(&resp).is_empty());
}

#[tokio::test]
async fn test_authenticator_failure_is_tagged() {
    let server = MockServer::start_async().await;
    let transport = transport_for(&server);

    let auth = |_props: RequestProps| async move {
        Err::<RequestProps, _>(TransportError::Auth("login rejected".into()))
    };
    let resp: SdkResponse<Value, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/me").authenticator(&auth))
        .await;

    assert_eq!(error_message(&resp), "Authentication error: login rejected");
}

#[tokio::test]
async fn test_per_call_timeout() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/slow");
            then.status(200)
                .delay(Duration::from_secs(3))
                .body("late");
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<String, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/slow").options(TransportOptions::new().timeout(1)))
        .await;

    assert!(error_message(&resp).starts_with("Timeout"), "{resp:?}");
    assert_eq!(transport.settings().timeout, 120);
}

#[tokio::test]
async fn test_max_body_size() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/big");
            then.status(200)
                .header("Content-Type", "text/plain")
                .body("x".repeat(1024));
        })
        .await;

    let transport = transport_for(&server);
    let resp: SdkResponse<String, Value> = transport
        .request(ApiCall::new(HttpMethod::Get, "/big").options(TransportOptions::new().max_body_size(16)))
        .await;

    assert!(error_message(&resp).contains("max_body_size"), "{resp:?}");
}

#[tokio::test]
async fn test_absolute_path_bypasses_base_url() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/elsewhere").query_param("q", "1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"ok": 1}));
        })
        .await;

    let settings = TransportSettings::new("http://127.0.0.1:1/api/4.0", "4.0");
    let transport = ReqwestTransport::new(settings).unwrap();

    let resp: SdkResponse<Value, Value> = transport
        .request(
            ApiCall::new(HttpMethod::Get, server.url("/elsewhere"))
                .query(Values::new().with("q", 1_i64)),
        )
        .await;

    assert_eq!(resp.value(), Some(&json!({"ok": 1})));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_redirect_policies() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/old");
            then.status(302).header("Location", server.url("/api/4.0/new"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/new");
            then.status(200).header("Content-Type", "text/plain").body("moved");
        })
        .await;

    let transport = transport_for(&server);

    let followed: SdkResponse<String, Value> =
        transport.request(ApiCall::new(HttpMethod::Get, "/old")).await;
    assert_eq!(followed.value().map(String::as_str), Some("moved"));

    let manual: SdkResponse<String, ApiError> = transport
        .request(
            ApiCall::new(HttpMethod::Get, "/old")
                .options(TransportOptions::new().redirect(RedirectPolicy::Manual)),
        )
        .await;
    assert!(!manual.is_ok());
    assert!(error_message(&manual).starts_with("302"), "{manual:?}");
}

#[tokio::test]
async fn test_stream_hands_bytes_to_callback() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/4.0/exports/1")
                .header("Authorization", "Bearer stream-token");
            then.status(200)
                .header("Content-Type", "application/octet-stream")
                .body(vec![7_u8; 4096]);
        })
        .await;

    let transport = transport_for(&server);
    let auth = SessionAuthenticator::new(Arc::new(BearerTokenSession::new("stream-token")));

    let total = transport
        .stream(
            |mut stream| async move {
                let mut total = 0;
                while let Some(chunk) = stream.next().await {
                    total += chunk.unwrap().len();
                }
                total
            },
            ApiCall::new(HttpMethod::Get, "/exports/1").authenticator(&auth),
        )
        .await
        .unwrap();

    assert_eq!(total, 4096);
}

#[tokio::test]
async fn test_stream_raises_on_error_status() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/exports/2");
            then.status(500).body("failed");
        })
        .await;

    let transport = transport_for(&server);
    let result = transport
        .stream(
            |_stream| async { 0_usize },
            ApiCall::new(HttpMethod::Get, "/exports/2"),
        )
        .await;

    match result {
        Err(TransportError::Http { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body.as_ref(), b"failed");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_raises_on_auth_failure() {
    let server = MockServer::start_async().await;
    let transport = transport_for(&server);
    let auth = SessionAuthenticator::new(Arc::new(BearerTokenSession::new("")));

    let result = transport
        .stream(
            |_stream| async { 0_usize },
            ApiCall::new(HttpMethod::Get, "/exports/3").authenticator(&auth),
        )
        .await;

    assert!(matches!(result, Err(TransportError::Auth(_))));
}

/// Generated API methods are written against the trait, not the adapter
async fn me<T: Transport>(transport: &T) -> SdkResponse<User, ApiError> {
    transport.request(ApiCall::new(HttpMethod::Get, "/me")).await
}

#[tokio::test]
async fn test_generic_over_transport() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/4.0/me");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"id": 7, "name": "Me"}));
        })
        .await;

    let resp = me(&transport_for(&server)).await;
    assert_eq!(resp.value().map(|u| u.id), Some(7));
}
