// libs/appointment-cell/src/services/appointment.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info, warn};

use billing_cell::services::LedgerService;
use doctor_cell::services::DoctorService;
use pharmacy_cell::services::PrescriptionService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    booking_description, Appointment, AppointmentError, CancelAppointmentRequest,
    CreateAppointmentRequest, UpdateAppointmentRequest, CANCELLED_STATUS, SCHEDULED_STATUS,
};
use crate::services::status::StatusService;

/// Appointment reads embed the doctor's name and the status name.
const APPOINTMENT_SELECT: &str = "*,doctor:doctors(first_name,last_name),status:statuses(status_name)";

pub struct AppointmentService {
    supabase: SupabaseClient,
    ledger: LedgerService,
    prescriptions: PrescriptionService,
    doctors: DoctorService,
    statuses: StatusService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            ledger: LedgerService::new(config),
            prescriptions: PrescriptionService::new(config),
            doctors: DoctorService::new(config),
            statuses: StatusService::new(config),
        }
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    async fn query(&self, filter: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select={}{}&order=appointment_date_time.desc",
            APPOINTMENT_SELECT, filter
        );
        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(appointments)
    }

    fn owner_filter(owner: Option<&str>) -> String {
        owner
            .map(|user_id| format!("&user_id=eq.{}", urlencoding::encode(user_id)))
            .unwrap_or_default()
    }

    /// All appointments, or only `owner`'s when given.
    pub async fn list_appointments(
        &self,
        owner: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.query(&Self::owner_filter(owner), auth_token).await
    }

    pub async fn list_by_doctor(
        &self,
        doctor_id: i64,
        owner: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = format!("&doctor_id=eq.{}{}", doctor_id, Self::owner_filter(owner));
        self.query(&filter, auth_token).await
    }

    pub async fn list_by_status(
        &self,
        status_id: i64,
        owner: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = format!("&status_id=eq.{}{}", status_id, Self::owner_filter(owner));
        self.query(&filter, auth_token).await
    }

    pub async fn get_appointment(&self, appointment_id: i64, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.query(&format!("&id=eq.{}", appointment_id), auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    /// Loads an appointment the caller may see: its owner or an administrator.
    pub async fn get_for_user(
        &self,
        appointment_id: i64,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        if !user.can_access(&appointment.user_id) {
            return Err(AppointmentError::Unauthorized);
        }
        Ok(appointment)
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    /// Books an appointment for `user` and charges the booking fee to their
    /// account. A booking whose fee cannot be charged is removed again.
    pub async fn create_appointment(
        &self,
        user: &User,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        request.validate()?;

        let doctor = self.doctors.get_doctor(request.doctor_id, auth_token).await?;
        if !doctor.is_active {
            return Err(AppointmentError::DoctorInactive(doctor.id));
        }

        let status = match request.status_id {
            Some(status_id) => self.statuses.require_status(status_id, auth_token).await?,
            None => self.statuses.get_by_name(SCHEDULED_STATUS, auth_token).await?,
        };

        let now = Utc::now().to_rfc3339();
        let appointment_data = json!({
            "user_id": user.id,
            "patient_first_name": request.patient_first_name.trim(),
            "patient_last_name": request.patient_last_name.trim(),
            "patient_email": request.patient_email.trim(),
            "patient_phone_number": request.patient_phone_number,
            "appointment_date_time": request.appointment_date_time.to_rfc3339(),
            "appointment_type": request.appointment_type.trim(),
            "notes": request.notes,
            "doctor_id": doctor.id,
            "status_id": status.id,
            "created_at": now,
        });

        let path = format!("/rest/v1/appointments?select={}", APPOINTMENT_SELECT);
        let created: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            Some(auth_token),
            Some(appointment_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let appointment = created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;

        let description = booking_description(&doctor.full_name(), appointment.appointment_date_time);
        let charged = match self.ledger.get_or_create_account(&user.id, auth_token).await {
            Ok(account) => {
                self.ledger
                    .charge_appointment(account.id, appointment.id, description, auth_token)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = charged {
            error!("Fee for appointment {} could not be charged: {}", appointment.id, e);
            self.withdraw_booking(appointment.id, auth_token).await;
            return Err(e.into());
        }

        info!(
            "Appointment {} booked for user {} with doctor {} ({} charged)",
            appointment.id, user.id, doctor.id, self.ledger.appointment_fee()
        );
        Ok(appointment)
    }

    /// Deletes a booking whose fee was never charged. Patients cannot delete
    /// appointments, so this runs under the service-role key.
    async fn withdraw_booking(&self, appointment_id: i64, auth_token: &str) {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        match self
            .supabase
            .execute(Method::DELETE, &path, Some(self.supabase.privileged_token(auth_token)), None)
            .await
        {
            Ok(()) => info!("Withdrew uncharged appointment {}", appointment_id),
            Err(e) => warn!("Uncharged appointment {} could not be withdrawn: {}", appointment_id, e),
        }
    }

    // ==============================================================================
    // UPDATES AND CANCELLATION
    // ==============================================================================

    /// Applies an edit. Moving the appointment into the cancelled status runs
    /// the same refunds as an explicit cancel.
    pub async fn update_appointment(
        &self,
        existing: Appointment,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if request.id != existing.id {
            return Err(AppointmentError::IdMismatch("Appointment"));
        }
        request.validate()?;

        let new_status = self.statuses.require_status(request.status_id, auth_token).await?;
        if request.doctor_id != existing.doctor_id {
            self.doctors.get_doctor(request.doctor_id, auth_token).await?;
        }

        let becomes_cancelled = new_status.is_cancelled() && !existing.is_cancelled();
        if becomes_cancelled {
            self.refund_for_cancellation(&existing, auth_token).await?;
        }

        let now = Utc::now().to_rfc3339();
        let mut update_data = json!({
            "patient_first_name": request.patient_first_name.trim(),
            "patient_last_name": request.patient_last_name.trim(),
            "patient_email": request.patient_email.trim(),
            "patient_phone_number": request.patient_phone_number,
            "appointment_date_time": request.appointment_date_time.to_rfc3339(),
            "appointment_type": request.appointment_type.trim(),
            "notes": request.notes,
            "doctor_id": request.doctor_id,
            "status_id": new_status.id,
            "updated_at": now,
        });
        if becomes_cancelled {
            update_data["cancelled_at"] = json!(now);
            update_data["cancellation_reason"] = json!(request.cancellation_reason);
        }

        let updated = self.patch(existing.id, update_data, auth_token).await?;
        debug!("Appointment {} updated", updated.id);
        Ok(updated)
    }

    /// Cancels the appointment: refunds its fulfilled prescriptions, then
    /// its booking fee, then marks it cancelled. Prescriptions are kept.
    pub async fn cancel_appointment(
        &self,
        appointment: Appointment,
        request: CancelAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if appointment.is_cancelled() {
            return Err(AppointmentError::AlreadyCancelled);
        }

        let cancelled = self.statuses.get_by_name(CANCELLED_STATUS, auth_token).await?;

        self.refund_for_cancellation(&appointment, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let updated = self.patch(
            appointment.id,
            json!({
                "status_id": cancelled.id,
                "cancelled_at": now,
                "cancellation_reason": request.reason,
                "updated_at": now,
            }),
            auth_token,
        ).await?;

        info!("Appointment {} cancelled", appointment.id);
        Ok(updated)
    }

    async fn refund_for_cancellation(&self, appointment: &Appointment, auth_token: &str) -> Result<(), AppointmentError> {
        let account = self.ledger.get_or_create_account(&appointment.user_id, auth_token).await?;

        let prescriptions = self
            .prescriptions
            .list_for_appointment(appointment.id, None, auth_token)
            .await?;
        for prescription in prescriptions.iter().filter(|p| p.is_fulfilled) {
            self.prescriptions.refund_charge(prescription, account.id, auth_token).await?;
        }

        self.ledger.refund_appointment(account.id, appointment.id, auth_token).await?;
        Ok(())
    }

    async fn patch(
        &self,
        appointment_id: i64,
        body: serde_json::Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", appointment_id, APPOINTMENT_SELECT);
        let updated: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        updated.into_iter().next().ok_or(AppointmentError::NotFound(appointment_id))
    }

    // ==============================================================================
    // CASCADING DELETE
    // ==============================================================================

    /// Deletes an appointment and its prescriptions.
    ///
    /// Every charge is refunded before the row it belongs to is removed:
    /// each prescription is refunded (when fulfilled) and then deleted, then
    /// the booking fee is refunded, then the appointment is deleted.
    pub async fn delete_appointment(&self, appointment_id: i64, auth_token: &str) -> Result<(), AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        let account = self.ledger.get_or_create_account(&appointment.user_id, auth_token).await?;

        let prescriptions = self
            .prescriptions
            .list_for_appointment(appointment_id, None, auth_token)
            .await?;

        for prescription in &prescriptions {
            self.prescriptions.refund_charge(prescription, account.id, auth_token).await?;
            self.prescriptions.delete_row(prescription.id, auth_token).await?;
            debug!("Prescription {} of appointment {} removed", prescription.id, appointment_id);
        }

        self.ledger.refund_appointment(account.id, appointment_id, auth_token).await?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!(
            "Appointment {} deleted with {} prescription(s)",
            appointment_id,
            prescriptions.len()
        );
        Ok(())
    }
}
