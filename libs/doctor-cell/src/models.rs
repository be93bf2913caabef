use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::validation::FieldValidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub date_joined: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorResponse {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub full_name: String,
}

impl From<Doctor> for DoctorResponse {
    fn from(doctor: Doctor) -> Self {
        let full_name = doctor.full_name();
        Self { doctor, full_name }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorRequest {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Field rules shared by create and update.
pub struct DoctorFields<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone_number: Option<&'a str>,
    pub specialization: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub profile_image_url: Option<&'a str>,
}

impl DoctorFields<'_> {
    pub fn validate(&self) -> Result<(), DoctorError> {
        FieldValidator::new()
            .required("First name", self.first_name)
            .max_length("First name", self.first_name, 50)
            .required("Last name", self.last_name)
            .max_length("Last name", self.last_name, 50)
            .required("Email", self.email)
            .max_length("Email", self.email, 100)
            .email("Email", self.email)
            .optional_max_length("Phone number", self.phone_number, 15)
            .optional_phone("Phone number", self.phone_number)
            .optional_max_length("Specialization", self.specialization, 100)
            .optional_max_length("Bio", self.bio, 500)
            .optional_max_length("Profile image URL", self.profile_image_url, 255)
            .optional_url("Profile image URL", self.profile_image_url)
            .finish()
            .map_err(DoctorError::ValidationError)
    }
}

impl CreateDoctorRequest {
    pub fn fields(&self) -> DoctorFields<'_> {
        DoctorFields {
            first_name: &self.first_name,
            last_name: &self.last_name,
            email: &self.email,
            phone_number: self.phone_number.as_deref(),
            specialization: self.specialization.as_deref(),
            bio: self.bio.as_deref(),
            profile_image_url: self.profile_image_url.as_deref(),
        }
    }
}

impl UpdateDoctorRequest {
    pub fn fields(&self) -> DoctorFields<'_> {
        DoctorFields {
            first_name: &self.first_name,
            last_name: &self.last_name,
            email: &self.email,
            phone_number: self.phone_number.as_deref(),
            specialization: self.specialization.as_deref(),
            bio: self.bio.as_deref(),
            profile_image_url: self.profile_image_url.as_deref(),
        }
    }
}

#[derive(Debug)]
pub enum DoctorError {
    NotFound(i64),
    EmailTaken(String),
    IdMismatch,
    InUse(i64),
    ValidationError(String),
    DatabaseError(String),
}

impl std::fmt::Display for DoctorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoctorError::NotFound(id) => write!(f, "Doctor {} not found", id),
            DoctorError::EmailTaken(email) => write!(f, "A doctor with email {} already exists", email),
            DoctorError::IdMismatch => write!(f, "Doctor ID mismatch"),
            DoctorError::InUse(id) => write!(f, "Doctor {} has appointments and cannot be deleted", id),
            DoctorError::ValidationError(msg) => write!(f, "{}", msg),
            DoctorError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for DoctorError {}

impl From<anyhow::Error> for DoctorError {
    fn from(e: anyhow::Error) -> Self {
        DoctorError::DatabaseError(e.to_string())
    }
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound(_) => AppError::NotFound(e.to_string()),
            DoctorError::EmailTaken(_) | DoctorError::InUse(_) => AppError::Conflict(e.to_string()),
            DoctorError::IdMismatch => AppError::BadRequest(e.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
