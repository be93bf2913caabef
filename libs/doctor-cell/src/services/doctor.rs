use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All doctors, ordered by surname
    pub async fn list_doctors(&self, auth_token: &str) -> Result<Vec<Doctor>, DoctorError> {
        let doctors: Vec<Doctor> = self.supabase.request(
            Method::GET,
            "/rest/v1/doctors?order=last_name.asc,first_name.asc",
            Some(auth_token),
            None,
        ).await?;

        Ok(doctors)
    }

    /// Get doctor by ID
    pub async fn get_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        result.into_iter().next().ok_or(DoctorError::NotFound(doctor_id))
    }

    async fn find_by_email(&self, email: &str, auth_token: &str) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("/rest/v1/doctors?email=eq.{}", urlencoding::encode(email));
        let result: Vec<Doctor> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(result.into_iter().next())
    }

    /// Create a new doctor profile
    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        request.fields().validate()?;
        debug!("Creating new doctor profile for: {}", request.email);

        if self.find_by_email(&request.email, auth_token).await?.is_some() {
            return Err(DoctorError::EmailTaken(request.email));
        }

        let now = Utc::now().to_rfc3339();
        let doctor_data = json!({
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "email": request.email.trim(),
            "phone_number": request.phone_number,
            "specialization": request.specialization,
            "bio": request.bio,
            "profile_image_url": request.profile_image_url,
            "is_active": true,
            "date_joined": now,
            "created_at": now,
        });

        let result: Vec<Doctor> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(auth_token),
            Some(doctor_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor profile".to_string()))?;

        info!("Doctor profile created successfully with ID: {}", doctor.id);
        Ok(doctor)
    }

    /// Update doctor profile
    pub async fn update_doctor(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        if request.id != doctor_id {
            return Err(DoctorError::IdMismatch);
        }
        request.fields().validate()?;

        let existing = self.get_doctor(doctor_id, auth_token).await?;

        if !existing.email.eq_ignore_ascii_case(&request.email) {
            if let Some(other) = self.find_by_email(&request.email, auth_token).await? {
                if other.id != doctor_id {
                    return Err(DoctorError::EmailTaken(request.email));
                }
            }
        }

        let update_data = json!({
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "email": request.email.trim(),
            "phone_number": request.phone_number,
            "specialization": request.specialization,
            "bio": request.bio,
            "profile_image_url": request.profile_image_url,
            "is_active": request.is_active.unwrap_or(existing.is_active),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let doctor = result.into_iter().next().ok_or(DoctorError::NotFound(doctor_id))?;
        debug!("Doctor {} updated", doctor_id);
        Ok(doctor)
    }

    /// Delete a doctor with no appointments on record
    pub async fn delete_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<(), DoctorError> {
        self.get_doctor(doctor_id, auth_token).await?;

        let usage_path = format!("/rest/v1/appointments?doctor_id=eq.{}&select=id&limit=1", doctor_id);
        let usage: Vec<Value> = self.supabase.request(
            Method::GET,
            &usage_path,
            Some(auth_token),
            None,
        ).await?;

        if !usage.is_empty() {
            return Err(DoctorError::InUse(doctor_id));
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }
}
