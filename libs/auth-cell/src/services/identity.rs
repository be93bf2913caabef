use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AuthError, LoginRequest, LoginResponse, RegisterRequest, SessionPayload};

/// Registration, sign-in and profile lookups against Supabase Auth.
pub struct IdentityService {
    supabase: SupabaseClient,
}

impl IdentityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Signs a new user up. Profile fields travel in user metadata; the role
    /// is never taken from the request.
    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        let body = json!({
            "email": email,
            "password": request.password,
            "data": {
                "first_name": request.first_name.trim(),
                "last_name": request.last_name.trim(),
                "address": request.address,
            }
        });

        self.supabase
            .sign_up(body)
            .await
            .map_err(AuthError::from_upstream)?;

        info!("Registered new user {}", email);
        Ok(())
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        debug!("Password sign-in for {}", email);

        let payload = self
            .supabase
            .sign_in_with_password(json!({
                "email": email,
                "password": request.password,
            }))
            .await
            .map_err(|e| {
                warn!("Sign-in failed for {}", email);
                AuthError::from_upstream(e)
            })?;

        let session: SessionPayload = serde_json::from_value(payload)
            .map_err(|e| AuthError::Upstream(format!("Unexpected session payload: {}", e)))?;

        Ok(session.into())
    }

    pub async fn profile(&self, auth_token: &str) -> Result<Value, AuthError> {
        self.supabase
            .get_user_profile(auth_token)
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))
    }
}
