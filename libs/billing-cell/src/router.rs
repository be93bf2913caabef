use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn account_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/me", get(handlers::get_my_account))
        .route("/me/transactions", get(handlers::get_my_transactions))
        // Administrator views
        .route("/user/{user_id}", get(handlers::get_account_by_user))
        .route("/user/{user_id}/transactions", get(handlers::get_user_transactions))
        .route("/{account_id}/reconcile", post(handlers::reconcile_account))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
