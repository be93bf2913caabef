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
use shared_utils::extractor::{require_admin, require_owner_or_admin};

use crate::models::{
    CreateMedicineRequest, CreatePrescriptionRequest, Prescription, PrescriptionResponse,
    UpdateMedicineRequest,
};
use crate::services::{MedicineService, PrescriptionService};

// ==============================================================================
// MEDICINE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_medicines(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let medicines = MedicineService::new(&state).list_medicines(auth.token()).await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn list_available_medicines(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let medicines = MedicineService::new(&state).list_available(auth.token()).await?;
    Ok(Json(json!(medicines)))
}

#[axum::debug_handler]
pub async fn get_medicine(
    State(state): State<Arc<AppConfig>>,
    Path(medicine_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let medicine = MedicineService::new(&state).get_medicine(medicine_id, auth.token()).await?;
    Ok(Json(json!(medicine)))
}

#[axum::debug_handler]
pub async fn create_medicine(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let medicine = MedicineService::new(&state).create_medicine(request, auth.token()).await?;
    Ok((StatusCode::CREATED, Json(json!(medicine))))
}

#[axum::debug_handler]
pub async fn update_medicine(
    State(state): State<Arc<AppConfig>>,
    Path(medicine_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateMedicineRequest>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    MedicineService::new(&state)
        .update_medicine(medicine_id, request, auth.token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn delete_medicine(
    State(state): State<Arc<AppConfig>>,
    Path(medicine_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    MedicineService::new(&state).delete_medicine(medicine_id, auth.token()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// PRESCRIPTION HANDLERS
// ==============================================================================

fn to_responses(prescriptions: Vec<Prescription>) -> Vec<PrescriptionResponse> {
    prescriptions.into_iter().map(PrescriptionResponse::from).collect()
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let prescriptions = PrescriptionService::new(&state).list_all(auth.token()).await?;
    Ok(Json(json!(to_responses(prescriptions))))
}

#[axum::debug_handler]
pub async fn list_my_prescriptions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let prescriptions = PrescriptionService::new(&state)
        .list_for_user(&user.id, auth.token())
        .await?;
    Ok(Json(json!(to_responses(prescriptions))))
}

#[axum::debug_handler]
pub async fn list_appointment_prescriptions(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let owner_filter = (!user.is_admin()).then_some(user.id.as_str());

    let prescriptions = PrescriptionService::new(&state)
        .list_for_appointment(appointment_id, owner_filter, auth.token())
        .await?;
    Ok(Json(json!(to_responses(prescriptions))))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let prescription = PrescriptionService::new(&state)
        .get_prescription(prescription_id, auth.token())
        .await?;
    require_owner_or_admin(&user, &prescription.user_id)?;

    Ok(Json(json!(PrescriptionResponse::from(prescription))))
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;

    let prescription = PrescriptionService::new(&state)
        .create_prescription(request, auth.token())
        .await?;
    Ok((StatusCode::CREATED, Json(json!(PrescriptionResponse::from(prescription)))))
}

#[axum::debug_handler]
pub async fn fulfill_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&state);

    let prescription = service.get_prescription(prescription_id, auth.token()).await?;
    require_owner_or_admin(&user, &prescription.user_id)?;

    let fulfilled = service.fulfill_prescription(prescription, auth.token()).await?;
    Ok(Json(json!(PrescriptionResponse::from(fulfilled))))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;

    PrescriptionService::new(&state)
        .delete_prescription(prescription_id, auth.token())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
