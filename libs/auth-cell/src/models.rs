use serde::{Deserialize, Serialize};

use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::validation::FieldValidator;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        FieldValidator::new()
            .required("Email", &self.email)
            .email("Email", &self.email)
            .password("Password", &self.password)
            .required("First name", &self.first_name)
            .max_length("First name", &self.first_name, 50)
            .required("Last name", &self.last_name)
            .max_length("Last name", &self.last_name, 50)
            .optional_max_length("Address", self.address.as_deref(), 200)
            .finish()
            .map_err(AuthError::ValidationError)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
    pub token: String,
    pub expires_in: i64,
}

/// The parts of a Supabase password-grant response we use.
#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    pub user: SessionUser,
}

#[derive(Debug, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
}

impl SessionUser {
    pub fn role(&self) -> Role {
        self.app_metadata
            .get("role")
            .and_then(|role| role.as_str())
            .map(Role::parse)
            .unwrap_or(Role::User)
    }
}

impl From<SessionPayload> for LoginResponse {
    fn from(session: SessionPayload) -> Self {
        let role = session.user.role();
        Self {
            user_id: session.user.id,
            email: session.user.email,
            role,
            token: session.access_token,
            expires_in: session.expires_in,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Identity provider error: {0}")]
    Upstream(String),
}

impl AuthError {
    /// Classifies a Supabase Auth failure by the status class the client
    /// tagged it with.
    pub fn from_upstream(e: anyhow::Error) -> Self {
        let message = e.to_string();
        if message.contains("already registered") || message.starts_with("Conflict") {
            AuthError::EmailTaken
        } else if message.starts_with("Bad request") || message.starts_with("Authentication error") {
            AuthError::InvalidCredentials
        } else {
            AuthError::Upstream(message)
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Auth(e.to_string()),
            AuthError::EmailTaken => AppError::Conflict(e.to_string()),
            AuthError::ValidationError(msg) => AppError::ValidationError(msg),
            AuthError::Upstream(msg) => AppError::ExternalService(msg),
        }
    }
}
