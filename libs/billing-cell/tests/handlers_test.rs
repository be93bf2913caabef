// libs/billing-cell/tests/handlers_test.rs
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use billing_cell::router::account_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn call(app: axum::Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn me_opens_account_on_first_visit() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::account_response(12, &patient.id, "0")
        ])))
        .mount(&server)
        .await;

    let (status, body) = call(account_routes(config.to_arc()), "GET", "/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account_id"], 12);
    assert_eq!(body["user_id"], patient.id);
    assert_eq!(body["user_name"], "patient@example.com");
    assert_eq!(body["balance"], "0");
}

#[tokio::test]
async fn my_transactions_are_empty_without_account() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::default(), &config.jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (status, body) = call(account_routes(config.to_arc()), "GET", "/me/transactions", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn my_transactions_are_listed_newest_first() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::account_response(4, &patient.id, "0.00")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/account_transactions"))
        .and(query_param("account_id", "eq.4"))
        .and(query_param("order", "transaction_date.desc,id.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::transaction_response(2, 4, "Refund", "-200.00", Some(1), None, Some(1)),
            MockSupabaseResponses::transaction_response(1, 4, "Appointment", "200.00", Some(1), None, None),
        ])))
        .mount(&server)
        .await;

    let (status, body) = call(account_routes(config.to_arc()), "GET", "/me/transactions", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[0]["transaction_type"], "Refund");
    assert_eq!(body[0]["reversed_transaction_id"], 1);
}

#[tokio::test]
async fn admin_views_require_administrator() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);

    let (status, body) = call(account_routes(config.to_arc()), "GET", "/user/someone-else", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = call(account_routes(config.to_arc()), "POST", "/1/reconcile", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_lookup_of_unknown_user_is_not_found() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::admin("admin@example.com"), &config.jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (status, _) = call(account_routes(config.to_arc()), "GET", "/user/nobody", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let config = TestConfig::default();

    let (status, _) = call(account_routes(config.to_arc()), "GET", "/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = JwtTestUtils::create_expired_token(&TestUser::default(), &config.jwt_secret);
    let (status, _) = call(account_routes(config.to_arc()), "GET", "/me", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
