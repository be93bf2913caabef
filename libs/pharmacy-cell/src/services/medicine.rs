use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateMedicineRequest, Medicine, PharmacyError, UpdateMedicineRequest};

pub struct MedicineService {
    supabase: SupabaseClient,
}

impl MedicineService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_medicines(&self, auth_token: &str) -> Result<Vec<Medicine>, PharmacyError> {
        let medicines: Vec<Medicine> = self.supabase.request(
            Method::GET,
            "/rest/v1/medicines?order=name.asc",
            Some(auth_token),
            None,
        ).await?;

        Ok(medicines)
    }

    pub async fn list_available(&self, auth_token: &str) -> Result<Vec<Medicine>, PharmacyError> {
        let medicines: Vec<Medicine> = self.supabase.request(
            Method::GET,
            "/rest/v1/medicines?is_available=eq.true&order=name.asc",
            Some(auth_token),
            None,
        ).await?;

        Ok(medicines)
    }

    pub async fn get_medicine(&self, medicine_id: i64, auth_token: &str) -> Result<Medicine, PharmacyError> {
        let path = format!("/rest/v1/medicines?id=eq.{}", medicine_id);
        let result: Vec<Medicine> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        result
            .into_iter()
            .next()
            .ok_or(PharmacyError::MedicineNotFound(medicine_id))
    }

    pub async fn create_medicine(
        &self,
        request: CreateMedicineRequest,
        auth_token: &str,
    ) -> Result<Medicine, PharmacyError> {
        request.validate().map_err(PharmacyError::ValidationError)?;
        debug!("Adding medicine {} to the catalogue", request.name);

        let medicine_data = json!({
            "name": request.name.trim(),
            "description": request.description,
            "price": request.price,
            "dosage": request.dosage,
            "manufacturer": request.manufacturer,
            "is_available": request.is_available.unwrap_or(true),
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Medicine> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/medicines",
            Some(auth_token),
            Some(medicine_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let medicine = result
            .into_iter()
            .next()
            .ok_or_else(|| PharmacyError::DatabaseError("Failed to create medicine".to_string()))?;

        info!("Medicine {} created with ID {}", medicine.name, medicine.id);
        Ok(medicine)
    }

    pub async fn update_medicine(
        &self,
        medicine_id: i64,
        request: UpdateMedicineRequest,
        auth_token: &str,
    ) -> Result<Medicine, PharmacyError> {
        if request.id != medicine_id {
            return Err(PharmacyError::IdMismatch("Medicine"));
        }
        request.validate().map_err(PharmacyError::ValidationError)?;

        let update_data = json!({
            "name": request.name.trim(),
            "description": request.description,
            "price": request.price,
            "dosage": request.dosage,
            "manufacturer": request.manufacturer,
            "is_available": request.is_available,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/medicines?id=eq.{}", medicine_id);
        let result: Vec<Medicine> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        result
            .into_iter()
            .next()
            .ok_or(PharmacyError::MedicineNotFound(medicine_id))
    }

    pub async fn delete_medicine(&self, medicine_id: i64, auth_token: &str) -> Result<(), PharmacyError> {
        self.get_medicine(medicine_id, auth_token).await?;

        let usage_path = format!(
            "/rest/v1/prescriptions?medicine_id=eq.{}&select=id&limit=1",
            medicine_id
        );
        let usage: Vec<Value> = self.supabase.request(
            Method::GET,
            &usage_path,
            Some(auth_token),
            None,
        ).await?;

        if !usage.is_empty() {
            return Err(PharmacyError::InUse(format!(
                "Medicine {} is referenced by existing prescriptions",
                medicine_id
            )));
        }

        let path = format!("/rest/v1/medicines?id=eq.{}", medicine_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Medicine {} deleted", medicine_id);
        Ok(())
    }
}
