use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

/// Flat fee charged to the patient's account for every booked appointment.
pub const DEFAULT_APPOINTMENT_FEE: Decimal = Decimal::from_parts(20000, 0, 0, false, 2);
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Key for ledger and fulfilment writes, which row-level security denies
    /// to patients.
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub appointment_fee: Decimal,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, ledger writes will use the caller's token");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            appointment_fee: env::var("APPOINTMENT_FEE")
                .ok()
                .and_then(|raw| match Decimal::from_str(raw.trim()) {
                    Ok(fee) if fee > Decimal::ZERO => Some(fee),
                    _ => {
                        warn!("APPOINTMENT_FEE '{}' is not a positive amount, using default", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_APPOINTMENT_FEE),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}
