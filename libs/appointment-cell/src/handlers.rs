use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{
    Appointment, AppointmentError, AppointmentForUpdate, AppointmentResponse,
    CancelAppointmentRequest, CreateAppointmentRequest, CreateStatusRequest,
    UpdateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::{AppointmentService, StatusService};

fn to_responses(appointments: Vec<Appointment>) -> Vec<AppointmentResponse> {
    appointments.into_iter().map(AppointmentResponse::from).collect()
}

/// Administrators see every appointment; everyone else only their own.
fn owner_scope(user: &User) -> Option<&str> {
    (!user.is_admin()).then_some(user.id.as_str())
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentService::new(&state)
        .list_appointments(owner_scope(&user), auth.token())
        .await?;

    Ok(Json(json!(to_responses(appointments))))
}

#[axum::debug_handler]
pub async fn list_by_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentService::new(&state)
        .list_by_doctor(doctor_id, owner_scope(&user), auth.token())
        .await?;

    Ok(Json(json!(to_responses(appointments))))
}

#[axum::debug_handler]
pub async fn list_by_status(
    State(state): State<Arc<AppConfig>>,
    Path(status_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentService::new(&state)
        .list_by_status(status_id, owner_scope(&user), auth.token())
        .await?;

    Ok(Json(json!(to_responses(appointments))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::new(&state)
        .get_for_user(appointment_id, &user, auth.token())
        .await?;

    Ok(Json(json!(AppointmentResponse::from(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment_for_update(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::new(&state)
        .get_for_user(appointment_id, &user, auth.token())
        .await?;

    Ok(Json(json!(AppointmentForUpdate::from(appointment))))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = AppointmentService::new(&state)
        .create_appointment(&user, request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(AppointmentResponse::from(appointment)))))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<StatusCode, AppError> {
    if request.id != appointment_id {
        return Err(AppointmentError::IdMismatch("Appointment").into());
    }

    let service = AppointmentService::new(&state);
    let existing = service.get_for_user(appointment_id, &user, auth.token()).await?;
    service.update_appointment(existing, request, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let service = AppointmentService::new(&state);
    let appointment = service.get_for_user(appointment_id, &user, auth.token()).await?;
    let cancelled = service.cancel_appointment(appointment, request, auth.token()).await?;

    Ok(Json(json!(AppointmentResponse::from(cancelled))))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    AppointmentService::new(&state)
        .delete_appointment(appointment_id, auth.token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// STATUS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_statuses(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let statuses = StatusService::new(&state).list_statuses(auth.token()).await?;
    Ok(Json(json!(statuses)))
}

#[axum::debug_handler]
pub async fn list_active_statuses(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let statuses = StatusService::new(&state).list_active(auth.token()).await?;
    Ok(Json(json!(statuses)))
}

#[axum::debug_handler]
pub async fn get_status(
    State(state): State<Arc<AppConfig>>,
    Path(status_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let status = StatusService::new(&state).get_status(status_id, auth.token()).await?;
    Ok(Json(json!(status)))
}

#[axum::debug_handler]
pub async fn create_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateStatusRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let status = StatusService::new(&state).create_status(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(status))))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    Path(status_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    StatusService::new(&state).update_status(status_id, request, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn delete_status(
    State(state): State<Arc<AppConfig>>,
    Path(status_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    StatusService::new(&state).delete_status(status_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}
