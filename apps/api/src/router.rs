use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use chrono::Utc;
use serde_json::{json, Value};

use appointment_cell::router::{appointment_routes, status_routes};
use auth_cell::router::auth_routes;
use billing_cell::router::account_routes;
use doctor_cell::router::doctor_routes;
use pharmacy_cell::router::{medicine_routes, prescription_routes};
use shared_config::AppConfig;

async fn root() -> Json<Value> {
    Json(json!({
        "message": "AppointMed API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "Healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/statuses", status_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/medicines", medicine_routes(state.clone()))
        .nest("/prescriptions", prescription_routes(state.clone()))
        .nest("/accounts", account_routes(state))
}
