use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn medicine_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_medicines).post(handlers::create_medicine))
        .route("/available", get(handlers::list_available_medicines))
        .route(
            "/{medicine_id}",
            get(handlers::get_medicine)
                .put(handlers::update_medicine)
                .delete(handlers::delete_medicine),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn prescription_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_prescriptions).post(handlers::create_prescription))
        .route("/mine", get(handlers::list_my_prescriptions))
        .route("/appointment/{appointment_id}", get(handlers::list_appointment_prescriptions))
        .route(
            "/{prescription_id}",
            get(handlers::get_prescription).delete(handlers::delete_prescription),
        )
        .route("/{prescription_id}/fulfill", post(handlers::fulfill_prescription))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
