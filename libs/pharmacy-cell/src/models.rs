// libs/pharmacy-cell/src/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billing_cell::models::LedgerError;
use shared_models::error::AppError;
use shared_utils::validation::FieldValidator;

// ==============================================================================
// MEDICINE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicineRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMedicineRequest {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub dosage: Option<String>,
    pub manufacturer: Option<String>,
    pub is_available: bool,
}

const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
const MAX_PRICE: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);

fn validate_medicine_fields(
    name: &str,
    description: Option<&str>,
    price: Decimal,
    dosage: Option<&str>,
    manufacturer: Option<&str>,
) -> Result<(), String> {
    FieldValidator::new()
        .required("Name", name)
        .max_length("Name", name, 200)
        .optional_max_length("Description", description, 500)
        .decimal_range("Price", price, MIN_PRICE, MAX_PRICE)
        .optional_max_length("Dosage", dosage, 100)
        .optional_max_length("Manufacturer", manufacturer, 200)
        .finish()
}

impl CreateMedicineRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_medicine_fields(
            &self.name,
            self.description.as_deref(),
            self.price,
            self.dosage.as_deref(),
            self.manufacturer.as_deref(),
        )
    }
}

impl UpdateMedicineRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_medicine_fields(
            &self.name,
            self.description.as_deref(),
            self.price,
            self.dosage.as_deref(),
            self.manufacturer.as_deref(),
        )
    }
}

// ==============================================================================
// PRESCRIPTION MODELS
// ==============================================================================

/// Name and price embedded from `medicines` on prescription reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineSummary {
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub appointment_id: i64,
    pub medicine_id: i64,
    pub user_id: String,
    pub quantity: i32,
    pub instructions: Option<String>,
    pub prescribed_date: DateTime<Utc>,
    pub is_fulfilled: bool,
    pub fulfilled_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub medicine: Option<MedicineSummary>,
}

impl Prescription {
    /// Price times quantity, when the medicine is known.
    pub fn total_cost(&self) -> Option<Decimal> {
        self.medicine
            .as_ref()
            .map(|medicine| medicine.price * Decimal::from(self.quantity))
    }

    pub fn medicine_name(&self) -> &str {
        self.medicine
            .as_ref()
            .map(|medicine| medicine.name.as_str())
            .unwrap_or("Unknown Medicine")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionResponse {
    pub id: i64,
    pub appointment_id: i64,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub medicine_price: Decimal,
    pub user_id: String,
    pub quantity: i32,
    pub instructions: Option<String>,
    pub prescribed_date: DateTime<Utc>,
    pub is_fulfilled: bool,
    pub fulfilled_date: Option<DateTime<Utc>>,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Prescription> for PrescriptionResponse {
    fn from(p: Prescription) -> Self {
        let medicine_name = p.medicine_name().to_string();
        let medicine_price = p.medicine.as_ref().map(|m| m.price).unwrap_or_default();
        let total_cost = p.total_cost().unwrap_or_default();
        Self {
            id: p.id,
            appointment_id: p.appointment_id,
            medicine_id: p.medicine_id,
            medicine_name,
            medicine_price,
            user_id: p.user_id,
            quantity: p.quantity,
            instructions: p.instructions,
            prescribed_date: p.prescribed_date,
            is_fulfilled: p.is_fulfilled,
            fulfilled_date: p.fulfilled_date,
            total_cost,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub appointment_id: i64,
    pub medicine_id: i64,
    pub user_id: String,
    pub quantity: i32,
    pub instructions: Option<String>,
}

impl CreatePrescriptionRequest {
    pub fn validate(&self) -> Result<(), String> {
        FieldValidator::new()
            .int_range("Quantity", self.quantity as i64, 1, 100)
            .optional_max_length("Instructions", self.instructions.as_deref(), 1000)
            .required("User id", &self.user_id)
            .finish()
    }
}

/// Owner of an appointment, as far as prescriptions care.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentOwner {
    pub id: i64,
    pub user_id: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PharmacyError {
    #[error("Medicine {0} not found")]
    MedicineNotFound(i64),

    #[error("Prescription {0} not found")]
    PrescriptionNotFound(i64),

    #[error("Appointment {0} not found")]
    AppointmentNotFound(i64),

    #[error("Prescription already fulfilled")]
    AlreadyFulfilled,

    #[error("{0} ID mismatch")]
    IdMismatch(&'static str),

    #[error("Prescription user must be the owner of appointment {0}")]
    OwnerMismatch(i64),

    #[error("{0}")]
    InUse(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PharmacyError {
    fn from(e: anyhow::Error) -> Self {
        PharmacyError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for PharmacyError {
    fn from(e: serde_json::Error) -> Self {
        PharmacyError::DatabaseError(format!("Unexpected row shape: {}", e))
    }
}

impl From<PharmacyError> for AppError {
    fn from(e: PharmacyError) -> Self {
        match e {
            PharmacyError::MedicineNotFound(_)
            | PharmacyError::PrescriptionNotFound(_)
            | PharmacyError::AppointmentNotFound(_) => AppError::NotFound(e.to_string()),
            PharmacyError::AlreadyFulfilled
            | PharmacyError::IdMismatch(_)
            | PharmacyError::OwnerMismatch(_) => AppError::BadRequest(e.to_string()),
            PharmacyError::ValidationError(msg) => AppError::ValidationError(msg),
            PharmacyError::InUse(msg) => AppError::Conflict(msg),
            PharmacyError::Ledger(inner) => inner.into(),
            PharmacyError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
