use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt::validate_token;

use crate::models::{LoginRequest, LoginResponse, RegisterRequest};
use crate::services::IdentityService;

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    IdentityService::new(&state).register(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Registration accepted" })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = IdentityService::new(&state).login(request).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn validate(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let user = validate_token(auth.token(), &state.supabase_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// Like [`validate`], but an invalid token is an answer, not an error.
#[axum::debug_handler]
pub async fn verify(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Json<Value> {
    let valid = validate_token(auth.token(), &state.supabase_jwt_secret).is_ok();
    Json(json!({ "valid": valid }))
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let auth_profile = IdentityService::new(&state).profile(auth.token()).await?;

    Ok(Json(json!({
        "user_id": user.id,
        "role": user.role,
        "auth_profile": auth_profile,
    })))
}
