use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/doctor/{doctor_id}", get(handlers::list_by_doctor))
        .route("/status/{status_id}", get(handlers::list_by_status))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/for-update", get(handlers::get_appointment_for_update))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn status_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_statuses).post(handlers::create_status))
        .route("/active", get(handlers::list_active_statuses))
        .route(
            "/{status_id}",
            get(handlers::get_status)
                .put(handlers::update_status)
                .delete(handlers::delete_status),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
