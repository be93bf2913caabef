use chrono::Utc;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, error, info, warn};

use billing_cell::models::AccountTransaction;
use billing_cell::services::LedgerService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentOwner, CreatePrescriptionRequest, Medicine, PharmacyError, Prescription,
};

/// Prescription reads embed the medicine name and price.
const PRESCRIPTION_SELECT: &str = "*,medicine:medicines(name,price)";

pub struct PrescriptionService {
    supabase: SupabaseClient,
    ledger: LedgerService,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            ledger: LedgerService::new(config),
        }
    }

    async fn query(&self, filter: &str, auth_token: &str) -> Result<Vec<Prescription>, PharmacyError> {
        let path = format!(
            "/rest/v1/prescriptions?select={}{}&order=prescribed_date.desc",
            PRESCRIPTION_SELECT, filter
        );
        let prescriptions: Vec<Prescription> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(prescriptions)
    }

    pub async fn list_all(&self, auth_token: &str) -> Result<Vec<Prescription>, PharmacyError> {
        self.query("", auth_token).await
    }

    pub async fn list_for_user(&self, user_id: &str, auth_token: &str) -> Result<Vec<Prescription>, PharmacyError> {
        let filter = format!("&user_id=eq.{}", urlencoding::encode(user_id));
        self.query(&filter, auth_token).await
    }

    /// Prescriptions of an appointment, optionally narrowed to one user.
    pub async fn list_for_appointment(
        &self,
        appointment_id: i64,
        user_id: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Prescription>, PharmacyError> {
        let mut filter = format!("&appointment_id=eq.{}", appointment_id);
        if let Some(user_id) = user_id {
            filter.push_str(&format!("&user_id=eq.{}", urlencoding::encode(user_id)));
        }
        self.query(&filter, auth_token).await
    }

    pub async fn get_prescription(&self, prescription_id: i64, auth_token: &str) -> Result<Prescription, PharmacyError> {
        let filter = format!("&id=eq.{}", prescription_id);
        self.query(&filter, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(PharmacyError::PrescriptionNotFound(prescription_id))
    }

    pub async fn create_prescription(
        &self,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, PharmacyError> {
        request.validate().map_err(PharmacyError::ValidationError)?;

        let owner_path = format!(
            "/rest/v1/appointments?id=eq.{}&select=id,user_id",
            request.appointment_id
        );
        let owners: Vec<AppointmentOwner> = self.supabase.request(
            Method::GET,
            &owner_path,
            Some(auth_token),
            None,
        ).await?;
        let owner = owners
            .into_iter()
            .next()
            .ok_or(PharmacyError::AppointmentNotFound(request.appointment_id))?;

        if owner.user_id != request.user_id {
            return Err(PharmacyError::OwnerMismatch(owner.id));
        }

        self.fetch_medicine(request.medicine_id, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let prescription_data = json!({
            "appointment_id": request.appointment_id,
            "medicine_id": request.medicine_id,
            "user_id": request.user_id,
            "quantity": request.quantity,
            "instructions": request.instructions,
            "prescribed_date": now,
            "is_fulfilled": false,
            "created_at": now,
        });

        let path = format!("/rest/v1/prescriptions?select={}", PRESCRIPTION_SELECT);
        let created: Vec<Prescription> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            Some(auth_token),
            Some(prescription_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let prescription = created
            .into_iter()
            .next()
            .ok_or_else(|| PharmacyError::DatabaseError("Failed to create prescription".to_string()))?;

        info!(
            "Prescription {} created for appointment {} (medicine {}, x{})",
            prescription.id, prescription.appointment_id, prescription.medicine_id, prescription.quantity
        );
        Ok(prescription)
    }

    /// Marks the prescription fulfilled and charges its cost to the owner.
    ///
    /// The update only matches an unfulfilled row, so two concurrent calls
    /// produce a single charge. If the charge cannot be recorded the row is
    /// put back to unfulfilled. Patients cannot write `is_fulfilled`, so both
    /// updates run under the service-role key.
    pub async fn fulfill_prescription(
        &self,
        prescription: Prescription,
        auth_token: &str,
    ) -> Result<Prescription, PharmacyError> {
        if prescription.is_fulfilled {
            return Err(PharmacyError::AlreadyFulfilled);
        }

        let now = Utc::now().to_rfc3339();
        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&is_fulfilled=eq.false&select={}",
            prescription.id, PRESCRIPTION_SELECT
        );
        let updated: Vec<Prescription> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(self.supabase.privileged_token(auth_token)),
            Some(json!({
                "is_fulfilled": true,
                "fulfilled_date": now,
                "updated_at": now,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let Some(mut fulfilled) = updated.into_iter().next() else {
            debug!("Prescription {} was fulfilled by a concurrent request", prescription.id);
            return Err(PharmacyError::AlreadyFulfilled);
        };
        if fulfilled.medicine.is_none() {
            fulfilled.medicine = prescription.medicine.clone();
        }

        match self.charge_fulfilment(&fulfilled, auth_token).await {
            Ok((account_id, amount)) => {
                info!("Prescription {} fulfilled, charged {} to account {}", fulfilled.id, amount, account_id);
                Ok(fulfilled)
            }
            Err(e) => {
                error!("Charge for prescription {} failed: {}", fulfilled.id, e);
                self.revert_fulfilment(fulfilled.id, auth_token).await;
                Err(e)
            }
        }
    }

    async fn charge_fulfilment(
        &self,
        fulfilled: &Prescription,
        auth_token: &str,
    ) -> Result<(i64, Decimal), PharmacyError> {
        let (medicine_name, amount) = match (fulfilled.medicine.as_ref(), fulfilled.total_cost()) {
            (Some(medicine), Some(total)) => (medicine.name.clone(), total),
            _ => {
                let medicine = self.fetch_medicine(fulfilled.medicine_id, auth_token).await?;
                let total = medicine.price * Decimal::from(fulfilled.quantity);
                (medicine.name, total)
            }
        };

        let account = self.ledger.get_or_create_account(&fulfilled.user_id, auth_token).await?;
        self.ledger.charge_prescription(
            account.id,
            fulfilled.id,
            amount,
            format!("Prescription for {} (x{})", medicine_name, fulfilled.quantity),
            auth_token,
        ).await?;

        Ok((account.id, amount))
    }

    /// Undoes a fulfilment whose charge was never written.
    async fn revert_fulfilment(&self, prescription_id: i64, auth_token: &str) {
        let path = format!("/rest/v1/prescriptions?id=eq.{}&is_fulfilled=eq.true", prescription_id);
        let result = self.supabase.execute(
            Method::PATCH,
            &path,
            Some(self.supabase.privileged_token(auth_token)),
            Some(json!({
                "is_fulfilled": false,
                "fulfilled_date": null,
                "updated_at": Utc::now().to_rfc3339(),
            })),
        ).await;

        match result {
            Ok(()) => info!("Prescription {} returned to unfulfilled", prescription_id),
            Err(e) => warn!("Prescription {} is fulfilled without a charge: {}", prescription_id, e),
        }
    }

    /// Reverses the charge of a fulfilled prescription. Unfulfilled
    /// prescriptions were never charged.
    pub async fn refund_charge(
        &self,
        prescription: &Prescription,
        account_id: i64,
        auth_token: &str,
    ) -> Result<Option<AccountTransaction>, PharmacyError> {
        if !prescription.is_fulfilled {
            return Ok(None);
        }

        let refund = self.ledger.refund_prescription(
            account_id,
            prescription.id,
            prescription.total_cost(),
            auth_token,
        ).await?;

        if refund.is_none() {
            warn!("Fulfilled prescription {} had no charge left to refund", prescription.id);
        }
        Ok(refund)
    }

    pub async fn delete_row(&self, prescription_id: i64, auth_token: &str) -> Result<(), PharmacyError> {
        let path = format!("/rest/v1/prescriptions?id=eq.{}", prescription_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;
        Ok(())
    }

    /// Refunds a fulfilled prescription to its owner, then deletes it.
    pub async fn delete_prescription(&self, prescription_id: i64, auth_token: &str) -> Result<(), PharmacyError> {
        let prescription = self.get_prescription(prescription_id, auth_token).await?;

        if prescription.is_fulfilled {
            let account = self.ledger.get_or_create_account(&prescription.user_id, auth_token).await?;
            self.refund_charge(&prescription, account.id, auth_token).await?;
        }

        self.delete_row(prescription_id, auth_token).await?;
        info!("Prescription {} deleted", prescription_id);
        Ok(())
    }

    async fn fetch_medicine(&self, medicine_id: i64, auth_token: &str) -> Result<Medicine, PharmacyError> {
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
}
