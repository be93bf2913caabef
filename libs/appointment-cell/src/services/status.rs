use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, AppointmentStatus, CreateStatusRequest, UpdateStatusRequest};

pub struct StatusService {
    supabase: SupabaseClient,
}

impl StatusService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn query(&self, filter: &str, auth_token: &str) -> Result<Vec<AppointmentStatus>, AppointmentError> {
        let path = format!("/rest/v1/statuses?order=display_order.asc{}", filter);
        let statuses: Vec<AppointmentStatus> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(statuses)
    }

    pub async fn list_statuses(&self, auth_token: &str) -> Result<Vec<AppointmentStatus>, AppointmentError> {
        self.query("", auth_token).await
    }

    pub async fn list_active(&self, auth_token: &str) -> Result<Vec<AppointmentStatus>, AppointmentError> {
        self.query("&is_active=eq.true", auth_token).await
    }

    pub async fn get_status(&self, status_id: i64, auth_token: &str) -> Result<AppointmentStatus, AppointmentError> {
        self.query(&format!("&id=eq.{}", status_id), auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::StatusNotFound(status_id))
    }

    /// Like [`get_status`](Self::get_status), but a missing status is a bad
    /// reference from the caller rather than a missing resource.
    pub async fn require_status(&self, status_id: i64, auth_token: &str) -> Result<AppointmentStatus, AppointmentError> {
        self.get_status(status_id, auth_token).await.map_err(|e| match e {
            AppointmentError::StatusNotFound(id) => {
                AppointmentError::InvalidStatus(format!("status {} does not exist", id))
            }
            other => other,
        })
    }

    /// Looks a status up by its unique name. A missing seed status is a
    /// configuration problem, reported as an invalid status.
    pub async fn get_by_name(&self, name: &str, auth_token: &str) -> Result<AppointmentStatus, AppointmentError> {
        self.query(&format!("&status_name=eq.{}", urlencoding::encode(name)), auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::InvalidStatus(format!("status '{}' is not configured", name)))
    }

    pub async fn create_status(
        &self,
        request: CreateStatusRequest,
        auth_token: &str,
    ) -> Result<AppointmentStatus, AppointmentError> {
        request.validate()?;

        let result: Vec<AppointmentStatus> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/statuses",
            Some(auth_token),
            Some(json!({
                "status_name": request.status_name.trim(),
                "status_description": request.status_description,
                "display_order": request.display_order,
                "is_active": true,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let status = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create status".to_string()))?;

        info!("Status '{}' created with ID {}", status.status_name, status.id);
        Ok(status)
    }

    pub async fn update_status(
        &self,
        status_id: i64,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<AppointmentStatus, AppointmentError> {
        if request.id != status_id {
            return Err(AppointmentError::IdMismatch("Status"));
        }
        request.validate()?;

        let path = format!("/rest/v1/statuses?id=eq.{}", status_id);
        let result: Vec<AppointmentStatus> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "status_name": request.status_name.trim(),
                "status_description": request.status_description,
                "display_order": request.display_order,
                "is_active": request.is_active,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        result.into_iter().next().ok_or(AppointmentError::StatusNotFound(status_id))
    }

    pub async fn delete_status(&self, status_id: i64, auth_token: &str) -> Result<(), AppointmentError> {
        self.get_status(status_id, auth_token).await?;

        let usage_path = format!("/rest/v1/appointments?status_id=eq.{}&select=id&limit=1", status_id);
        let usage: Vec<Value> = self.supabase.request(
            Method::GET,
            &usage_path,
            Some(auth_token),
            None,
        ).await?;

        if !usage.is_empty() {
            debug!("Refusing to delete status {} while appointments use it", status_id);
            return Err(AppointmentError::StatusInUse(status_id));
        }

        let path = format!("/rest/v1/statuses?id=eq.{}", status_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Status {} deleted", status_id);
        Ok(())
    }
}
