use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{AccountResponse, LedgerError};
use crate::services::LedgerService;

// ==============================================================================
// CALLER'S OWN ACCOUNT
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_account(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ledger = LedgerService::new(&state);

    let account = ledger.get_or_create_account(&user.id, auth.token()).await?;
    let response = AccountResponse::from_account(account, user.email.clone());

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn get_my_transactions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ledger = LedgerService::new(&state);

    let Some(account) = ledger.get_account_by_user_id(&user.id, auth.token()).await? else {
        debug!("User {} has no account yet", user.id);
        return Ok(Json(json!([])));
    };

    let transactions = ledger.get_transactions(account.id, auth.token()).await?;
    Ok(Json(json!(transactions)))
}

// ==============================================================================
// ADMINISTRATOR VIEWS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_account_by_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let ledger = LedgerService::new(&state);

    let account = ledger
        .get_account_by_user_id(&user_id, auth.token())
        .await?
        .ok_or(LedgerError::AccountNotFoundForUser(user_id))?;

    Ok(Json(json!(AccountResponse::from_account(account, None))))
}

#[axum::debug_handler]
pub async fn get_user_transactions(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let ledger = LedgerService::new(&state);

    let account = ledger
        .get_account_by_user_id(&user_id, auth.token())
        .await?
        .ok_or(LedgerError::AccountNotFoundForUser(user_id))?;

    let transactions = ledger.get_transactions(account.id, auth.token()).await?;
    Ok(Json(json!(transactions)))
}

#[axum::debug_handler]
pub async fn reconcile_account(
    State(state): State<Arc<AppConfig>>,
    Path(account_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let ledger = LedgerService::new(&state);

    let report = ledger.reconcile_account(account_id, auth.token()).await?;
    Ok(Json(json!(report)))
}
