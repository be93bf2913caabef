use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub appointment_fee: Decimal,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            appointment_fee: Decimal::new(200, 0),
        }
    }
}

impl TestConfig {
    /// Point the config at a mock server.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            appointment_fee: self.appointment_fee,
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: Role::User,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::User)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Administrator)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: self.role,
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role.as_str() },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row fixtures shaped like the PostgREST responses of each table.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(id: i64, email: &str, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
            "phone_number": "0215550100",
            "specialization": "General Practice",
            "bio": "Experienced physician",
            "profile_image_url": null,
            "date_joined": "2024-01-01T00:00:00Z",
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn status_response(id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "status_name": name,
            "status_description": format!("Appointment is {}", name.to_lowercase()),
            "display_order": id,
            "is_active": true
        })
    }

    pub fn appointment_response(id: i64, user_id: &str, doctor_id: i64, status_id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": user_id,
            "patient_first_name": "Test",
            "patient_last_name": "Patient",
            "patient_email": "patient@example.com",
            "patient_phone_number": null,
            "appointment_date_time": "2026-03-02T09:30:00Z",
            "appointment_type": "Consultation",
            "notes": null,
            "doctor_id": doctor_id,
            "status_id": status_id,
            "created_at": "2026-02-01T08:00:00Z",
            "updated_at": null,
            "cancelled_at": null,
            "cancellation_reason": null,
            "doctor": { "first_name": "Gregory", "last_name": "House" },
            "status": { "status_name": "Scheduled" }
        })
    }

    pub fn medicine_response(id: i64, name: &str, price: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "description": "Test medicine",
            "price": price,
            "dosage": "500mg",
            "manufacturer": "PharmaCorp",
            "is_available": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn prescription_response(
        id: i64,
        appointment_id: i64,
        user_id: &str,
        quantity: i32,
        is_fulfilled: bool,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "appointment_id": appointment_id,
            "medicine_id": 1,
            "user_id": user_id,
            "quantity": quantity,
            "instructions": "Twice daily after meals",
            "prescribed_date": "2026-02-01T08:30:00Z",
            "is_fulfilled": is_fulfilled,
            "fulfilled_date": if is_fulfilled { json!("2026-02-01T09:00:00Z") } else { json!(null) },
            "created_at": "2026-02-01T08:30:00Z",
            "updated_at": null,
            "medicine": { "name": "Amoxicillin", "price": 45.00 }
        })
    }

    pub fn account_response(id: i64, user_id: &str, balance: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": user_id,
            "balance": balance,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn transaction_response(
        id: i64,
        account_id: i64,
        transaction_type: &str,
        amount: &str,
        appointment_id: Option<i64>,
        prescription_id: Option<i64>,
        reversed_transaction_id: Option<i64>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "account_id": account_id,
            "transaction_type": transaction_type,
            "amount": amount,
            "description": format!("{} transaction", transaction_type),
            "appointment_id": appointment_id,
            "prescription_id": prescription_id,
            "reversed_transaction_id": reversed_transaction_id,
            "transaction_date": format!("2026-02-{:02}T10:00:00Z", (id % 28) + 1)
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
