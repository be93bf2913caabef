use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billing_cell::models::LedgerError;
use doctor_cell::models::DoctorError;
use pharmacy_cell::models::PharmacyError;
use shared_models::error::AppError;
use shared_utils::validation::FieldValidator;

pub const SCHEDULED_STATUS: &str = "Scheduled";
pub const CANCELLED_STATUS: &str = "Cancelled";

// ==============================================================================
// STATUS MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentStatus {
    pub id: i64,
    pub status_name: String,
    pub status_description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
}

impl AppointmentStatus {
    pub fn is_cancelled(&self) -> bool {
        self.status_name.eq_ignore_ascii_case(CANCELLED_STATUS)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStatusRequest {
    pub status_name: String,
    pub status_description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub id: i64,
    pub status_name: String,
    pub status_description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
}

fn validate_status_fields(name: &str, description: Option<&str>, display_order: i32) -> Result<(), AppointmentError> {
    FieldValidator::new()
        .required("Status name", name)
        .max_length("Status name", name, 50)
        .optional_max_length("Status description", description, 200)
        .check(display_order >= 0, "Display order cannot be negative")
        .finish()
        .map_err(AppointmentError::ValidationError)
}

impl CreateStatusRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        validate_status_fields(&self.status_name, self.status_description.as_deref(), self.display_order)
    }
}

impl UpdateStatusRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        validate_status_fields(&self.status_name, self.status_description.as_deref(), self.display_order)
    }
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedDoctor {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedStatus {
    pub status_name: String,
}

/// An `appointments` row with the doctor and status names embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub user_id: String,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: String,
    pub patient_phone_number: Option<String>,
    pub appointment_date_time: DateTime<Utc>,
    pub appointment_type: String,
    pub notes: Option<String>,
    pub doctor_id: i64,
    pub status_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing)]
    pub doctor: Option<EmbeddedDoctor>,
    #[serde(default, skip_serializing)]
    pub status: Option<EmbeddedStatus>,
}

impl Appointment {
    pub fn doctor_name(&self) -> String {
        match &self.doctor {
            None => "No Doctor Assigned".to_string(),
            Some(doctor) => {
                let name = format!("{} {}", doctor.first_name.trim(), doctor.last_name.trim());
                let name = name.trim();
                if name.is_empty() {
                    "Unknown Doctor".to_string()
                } else {
                    name.to_string()
                }
            }
        }
    }

    pub fn status_name(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.status_name.as_str())
            .unwrap_or("Unknown")
    }

    pub fn is_cancelled(&self) -> bool {
        self.status_name().eq_ignore_ascii_case(CANCELLED_STATUS)
    }

    pub fn patient_name(&self) -> String {
        format!("{} {}", self.patient_first_name, self.patient_last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub id: i64,
    pub user_id: String,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone_number: Option<String>,
    pub appointment_date_time: DateTime<Utc>,
    pub appointment_type: String,
    pub notes: Option<String>,
    pub doctor_id: i64,
    pub doctor_name: String,
    pub status_id: i64,
    pub status_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        let doctor_name = a.doctor_name();
        let status_name = a.status_name().to_string();
        let patient_name = a.patient_name();
        Self {
            id: a.id,
            user_id: a.user_id,
            patient_first_name: a.patient_first_name,
            patient_last_name: a.patient_last_name,
            patient_name,
            patient_email: a.patient_email,
            patient_phone_number: a.patient_phone_number,
            appointment_date_time: a.appointment_date_time,
            appointment_type: a.appointment_type,
            notes: a.notes,
            doctor_id: a.doctor_id,
            doctor_name,
            status_id: a.status_id,
            status_name,
            created_at: a.created_at,
            updated_at: a.updated_at,
            cancelled_at: a.cancelled_at,
            cancellation_reason: a.cancellation_reason,
        }
    }
}

/// Shape of the edit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentForUpdate {
    pub id: i64,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: String,
    pub patient_phone_number: Option<String>,
    pub appointment_date_time: DateTime<Utc>,
    pub appointment_type: String,
    pub notes: Option<String>,
    pub doctor_id: i64,
    pub status_id: i64,
}

impl From<Appointment> for AppointmentForUpdate {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            patient_first_name: a.patient_first_name,
            patient_last_name: a.patient_last_name,
            patient_email: a.patient_email,
            patient_phone_number: a.patient_phone_number,
            appointment_date_time: a.appointment_date_time,
            appointment_type: a.appointment_type,
            notes: a.notes,
            doctor_id: a.doctor_id,
            status_id: a.status_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: String,
    pub patient_phone_number: Option<String>,
    pub appointment_date_time: DateTime<Utc>,
    pub appointment_type: String,
    pub notes: Option<String>,
    pub doctor_id: i64,
    /// Defaults to the "Scheduled" status.
    pub status_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub id: i64,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub patient_email: String,
    pub patient_phone_number: Option<String>,
    pub appointment_date_time: DateTime<Utc>,
    pub appointment_type: String,
    pub notes: Option<String>,
    pub doctor_id: i64,
    pub status_id: i64,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

fn validate_patient_fields(
    first_name: &str,
    last_name: &str,
    email: &str,
    phone: Option<&str>,
    appointment_type: &str,
    notes: Option<&str>,
) -> Result<(), AppointmentError> {
    FieldValidator::new()
        .required("Patient first name", first_name)
        .max_length("Patient first name", first_name, 50)
        .required("Patient last name", last_name)
        .max_length("Patient last name", last_name, 50)
        .required("Patient email", email)
        .max_length("Patient email", email, 100)
        .email("Patient email", email)
        .optional_max_length("Patient phone number", phone, 15)
        .optional_phone("Patient phone number", phone)
        .required("Appointment type", appointment_type)
        .max_length("Appointment type", appointment_type, 100)
        .optional_max_length("Notes", notes, 1000)
        .finish()
        .map_err(AppointmentError::ValidationError)
}

impl CreateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        validate_patient_fields(
            &self.patient_first_name,
            &self.patient_last_name,
            &self.patient_email,
            self.patient_phone_number.as_deref(),
            &self.appointment_type,
            self.notes.as_deref(),
        )
    }
}

impl UpdateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        validate_patient_fields(
            &self.patient_first_name,
            &self.patient_last_name,
            &self.patient_email,
            self.patient_phone_number.as_deref(),
            &self.appointment_type,
            self.notes.as_deref(),
        )?;
        FieldValidator::new()
            .optional_max_length("Cancellation reason", self.cancellation_reason.as_deref(), 500)
            .finish()
            .map_err(AppointmentError::ValidationError)
    }
}

/// Ledger description of the booking fee.
pub fn booking_description(doctor_name: &str, at: DateTime<Utc>) -> String {
    format!("Appointment with {} on {}", doctor_name, at.format("%d/%m/%Y %H:%M"))
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(i64),

    #[error("Status {0} not found")]
    StatusNotFound(i64),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Doctor {0} not found")]
    DoctorNotFound(i64),

    #[error("Doctor {0} is not accepting appointments")]
    DoctorInactive(i64),

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("{0} ID mismatch")]
    IdMismatch(&'static str),

    #[error("Status {0} is in use by existing appointments")]
    StatusInUse(i64),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pharmacy(#[from] PharmacyError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(e: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(e.to_string())
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound(id) => AppointmentError::DoctorNotFound(id),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound(_)
            | AppointmentError::StatusNotFound(_)
            | AppointmentError::DoctorNotFound(_) => AppError::NotFound(e.to_string()),
            AppointmentError::InvalidStatus(_)
            | AppointmentError::DoctorInactive(_)
            | AppointmentError::AlreadyCancelled
            | AppointmentError::IdMismatch(_)
            | AppointmentError::StatusInUse(_) => AppError::BadRequest(e.to_string()),
            AppointmentError::Unauthorized => AppError::Forbidden(e.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Ledger(inner) => inner.into(),
            AppointmentError::Pharmacy(inner) => inner.into(),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
