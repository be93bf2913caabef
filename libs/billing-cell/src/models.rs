// libs/billing-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

// ==============================================================================
// ACCOUNT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_id: i64,
    pub user_id: String,
    pub user_name: Option<String>,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AccountResponse {
    pub fn from_account(account: Account, user_name: Option<String>) -> Self {
        Self {
            account_id: account.id,
            user_id: account.user_id,
            user_name,
            balance: account.balance,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

// ==============================================================================
// TRANSACTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Appointment,
    Prescription,
    Payment,
    Refund,
}

impl TransactionType {
    pub fn is_charge(&self) -> bool {
        matches!(self, TransactionType::Appointment | TransactionType::Prescription)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Appointment => write!(f, "Appointment"),
            TransactionType::Prescription => write!(f, "Prescription"),
            TransactionType::Payment => write!(f, "Payment"),
            TransactionType::Refund => write!(f, "Refund"),
        }
    }
}

/// Append-only ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTransaction {
    pub id: i64,
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    pub appointment_id: Option<i64>,
    pub prescription_id: Option<i64>,
    #[serde(default)]
    pub reversed_transaction_id: Option<i64>,
    pub transaction_date: DateTime<Utc>,
}

impl AccountTransaction {
    pub fn is_unlinked(&self) -> bool {
        self.appointment_id.is_none() && self.prescription_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub appointment_id: Option<i64>,
    pub prescription_id: Option<i64>,
    pub reversed_transaction_id: Option<i64>,
}

impl NewTransaction {
    pub fn charge(
        account_id: i64,
        subject: ChargeSubject,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        let (appointment_id, prescription_id) = subject.links();
        Self {
            account_id,
            transaction_type: subject.charge_type(),
            amount,
            description: description.into(),
            appointment_id,
            prescription_id,
            reversed_transaction_id: None,
        }
    }

    /// Reversal row for `original`: negated amount, same subject link.
    pub fn refund_of(original: &AccountTransaction, subject: ChargeSubject) -> Self {
        let (appointment_id, prescription_id) = subject.links();
        Self {
            account_id: original.account_id,
            transaction_type: TransactionType::Refund,
            amount: -original.amount,
            description: subject.refund_description(),
            appointment_id,
            prescription_id,
            reversed_transaction_id: Some(original.id),
        }
    }
}

/// The entity that caused a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeSubject {
    Appointment(i64),
    Prescription(i64),
}

impl ChargeSubject {
    pub fn charge_type(&self) -> TransactionType {
        match self {
            ChargeSubject::Appointment(_) => TransactionType::Appointment,
            ChargeSubject::Prescription(_) => TransactionType::Prescription,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ChargeSubject::Appointment(id) | ChargeSubject::Prescription(id) => *id,
        }
    }

    pub fn links(&self) -> (Option<i64>, Option<i64>) {
        match self {
            ChargeSubject::Appointment(id) => (Some(*id), None),
            ChargeSubject::Prescription(id) => (None, Some(*id)),
        }
    }

    /// Whether `transaction` carries a link to this subject.
    pub fn is_linked(&self, transaction: &AccountTransaction) -> bool {
        match self {
            ChargeSubject::Appointment(id) => transaction.appointment_id == Some(*id),
            ChargeSubject::Prescription(id) => transaction.prescription_id == Some(*id),
        }
    }

    pub fn refund_description(&self) -> String {
        match self {
            ChargeSubject::Appointment(id) => format!("Refund for cancelled appointment #{}", id),
            ChargeSubject::Prescription(id) => format!("Refund for cancelled prescription #{}", id),
        }
    }
}

impl fmt::Display for ChargeSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeSubject::Appointment(id) => write!(f, "appointment {}", id),
            ChargeSubject::Prescription(id) => write!(f, "prescription {}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub account_id: i64,
    pub previous_balance: Decimal,
    pub recomputed_balance: Decimal,
    pub drift: Decimal,
    pub corrected: bool,
    pub transaction_count: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Account {0} not found")]
    AccountNotFound(i64),

    #[error("No account found for user {0}")]
    AccountNotFoundForUser(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account {0} was modified concurrently, please retry")]
    ConcurrentUpdate(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::DatabaseError(format!("Unexpected row shape: {}", e))
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AccountNotFound(_) | LedgerError::AccountNotFoundForUser(_) => {
                AppError::NotFound(e.to_string())
            }
            LedgerError::InvalidAmount(msg) => AppError::ValidationError(msg),
            LedgerError::ConcurrentUpdate(_) => AppError::Conflict(e.to_string()),
            LedgerError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
