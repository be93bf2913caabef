// libs/pharmacy-cell/tests/medicine_test.rs
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pharmacy_cell::router::{medicine_routes, prescription_routes};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn send(app: axum::Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json");
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

fn token_for(user: &TestUser, config: &TestConfig) -> String {
    JwtTestUtils::create_test_token(user, &config.jwt_secret, None)
}

#[tokio::test]
async fn admin_creates_medicine() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    Mock::given(method("POST"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::medicine_response(6, "Loratadine", "12.50")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let token = token_for(&TestUser::admin("admin@example.com"), &config);
    let (status, body) = send(
        medicine_routes(config.to_arc()),
        "POST",
        "/",
        &token,
        Some(json!({ "name": "Loratadine", "price": "12.50", "dosage": "10mg" })),
    ).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 6);
    assert_eq!(body["price"], "12.50");
}

#[tokio::test]
async fn regular_user_cannot_manage_catalogue() {
    let config = TestConfig::default();
    let token = token_for(&TestUser::patient("p@example.com"), &config);

    let (status, _) = send(
        medicine_routes(config.to_arc()),
        "POST",
        "/",
        &token,
        Some(json!({ "name": "Loratadine", "price": 12.5 })),
    ).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(medicine_routes(config.to_arc()), "DELETE", "/1", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn out_of_range_price_is_rejected() {
    let config = TestConfig::default();
    let token = token_for(&TestUser::admin("admin@example.com"), &config);

    let (status, body) = send(
        medicine_routes(config.to_arc()),
        "POST",
        "/",
        &token,
        Some(json!({ "name": "Gold pills", "price": 20000 })),
    ).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Price"));
}

#[tokio::test]
async fn medicine_in_use_cannot_be_deleted() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(1, "Amoxicillin", "45.00")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("medicine_id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let token = token_for(&TestUser::admin("admin@example.com"), &config);
    let (status, _) = send(medicine_routes(config.to_arc()), "DELETE", "/1", &token, None).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_with_mismatched_id_is_bad_request() {
    let config = TestConfig::default();
    let token = token_for(&TestUser::admin("admin@example.com"), &config);

    let (status, body) = send(
        medicine_routes(config.to_arc()),
        "PUT",
        "/2",
        &token,
        Some(json!({ "id": 3, "name": "Ibuprofen", "price": "20.00", "is_available": true })),
    ).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Medicine ID mismatch");
}

#[tokio::test]
async fn prescription_of_another_user_is_forbidden() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::prescription_response(5, 10, "someone-else", 1, false)
        ])))
        .mount(&server)
        .await;

    let token = token_for(&TestUser::patient("p@example.com"), &config);
    let (status, _) = send(prescription_routes(config.to_arc()), "GET", "/5", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(prescription_routes(config.to_arc()), "POST", "/5/fulfill", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn prescription_read_model_includes_cost() {
    let server = MockServer::start().await;
    let config = TestConfig::with_url(server.uri());
    let patient = TestUser::patient("p@example.com");
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("user_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::prescription_response(5, 10, &patient.id, 3, false)
        ])))
        .mount(&server)
        .await;

    let token = token_for(&patient, &config);
    let (status, body) = send(prescription_routes(config.to_arc()), "GET", "/mine", &token, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["medicine_name"], "Amoxicillin");
    let total: rust_decimal::Decimal = body[0]["total_cost"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, rust_decimal::Decimal::new(135, 0));
}
