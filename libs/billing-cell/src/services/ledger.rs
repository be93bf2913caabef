use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Account, AccountTransaction, ChargeSubject, LedgerError, NewTransaction,
    ReconciliationReport,
};
use crate::services::reconciliation::{
    apply_delta, ledger_balance, resolve_original_charge, ChargeResolution,
};

const MAX_BALANCE_ATTEMPTS: usize = 3;
/// PostgREST caps unranged reads at its `max-rows`; ledger reads page below it.
const TRANSACTION_PAGE_SIZE: usize = 1000;

/// Per-user account ledger.
///
/// Every balance change is an appended `account_transactions` row followed by
/// a compare-and-swap on `accounts.balance`, so a stale read never silently
/// overwrites a concurrent change. Once the row is written the call succeeds;
/// a balance that could not be moved is left for [`LedgerService::reconcile_account`].
///
/// Reads run as the caller. Writes go out under the service-role key because
/// patients only have read access to their ledger.
pub struct LedgerService {
    supabase: SupabaseClient,
    appointment_fee: Decimal,
}

impl LedgerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            appointment_fee: config.appointment_fee,
        }
    }

    pub fn appointment_fee(&self) -> Decimal {
        self.appointment_fee
    }

    // ==============================================================================
    // ACCOUNTS
    // ==============================================================================

    pub async fn get_account(
        &self,
        account_id: i64,
        auth_token: &str,
    ) -> Result<Option<Account>, LedgerError> {
        let path = format!("/rest/v1/accounts?id=eq.{}", account_id);
        let rows: Vec<Account> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(rows.into_iter().next())
    }

    pub async fn get_account_by_user_id(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Option<Account>, LedgerError> {
        let path = format!("/rest/v1/accounts?user_id=eq.{}", urlencoding::encode(user_id));
        let rows: Vec<Account> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(rows.into_iter().next())
    }

    /// Returns the user's account, opening one with a zero balance on first use.
    pub async fn get_or_create_account(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Account, LedgerError> {
        if let Some(account) = self.get_account_by_user_id(user_id, auth_token).await? {
            return Ok(account);
        }

        debug!("Opening account for user {}", user_id);

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("return=representation,resolution=ignore-duplicates"),
        );

        let created: Vec<Account> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/accounts?on_conflict=user_id",
            Some(self.supabase.privileged_token(auth_token)),
            Some(json!({
                "user_id": user_id,
                "balance": Decimal::ZERO,
                "created_at": Utc::now().to_rfc3339(),
            })),
            Some(headers),
        ).await?;

        if let Some(account) = created.into_iter().next() {
            info!("Opened account {} for user {}", account.id, user_id);
            return Ok(account);
        }

        // Lost the race to a concurrent insert; the row exists now.
        self.get_account_by_user_id(user_id, auth_token)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFoundForUser(user_id.to_string()))
    }

    // ==============================================================================
    // TRANSACTIONS
    // ==============================================================================

    /// Every ledger row for an account, newest first.
    pub async fn get_transactions(
        &self,
        account_id: i64,
        auth_token: &str,
    ) -> Result<Vec<AccountTransaction>, LedgerError> {
        let mut rows: Vec<AccountTransaction> = Vec::new();

        loop {
            let path = format!(
                "/rest/v1/account_transactions?account_id=eq.{}&order=transaction_date.desc,id.desc&limit={}&offset={}",
                account_id,
                TRANSACTION_PAGE_SIZE,
                rows.len()
            );
            let page: Vec<AccountTransaction> = self.supabase.request(
                Method::GET,
                &path,
                Some(auth_token),
                None,
            ).await?;

            let last_page = page.len() < TRANSACTION_PAGE_SIZE;
            rows.extend(page);
            if last_page {
                break;
            }
        }

        debug!("Loaded {} transactions for account {}", rows.len(), account_id);
        Ok(rows)
    }

    /// Appends a row and moves the balance by its amount.
    ///
    /// Errors only when nothing was written.
    pub async fn add_transaction(
        &self,
        transaction: NewTransaction,
        auth_token: &str,
    ) -> Result<AccountTransaction, LedgerError> {
        if transaction.amount.is_zero() {
            return Err(LedgerError::InvalidAmount("Transaction amount cannot be zero".to_string()));
        }
        if transaction.transaction_type.is_charge() && transaction.amount.is_sign_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "{} charges must be positive, got {}",
                transaction.transaction_type, transaction.amount
            )));
        }

        let account = self
            .get_account(transaction.account_id, auth_token)
            .await?
            .ok_or(LedgerError::AccountNotFound(transaction.account_id))?;

        let row = self.insert_transaction(&transaction, auth_token).await?;
        self.settle_balance(account, &row, auth_token).await;

        info!(
            "Recorded {} transaction {} of {} on account {}",
            row.transaction_type, row.id, row.amount, row.account_id
        );

        Ok(row)
    }

    /// Charges the configured appointment fee to the account.
    pub async fn charge_appointment(
        &self,
        account_id: i64,
        appointment_id: i64,
        description: impl Into<String>,
        auth_token: &str,
    ) -> Result<AccountTransaction, LedgerError> {
        let transaction = NewTransaction::charge(
            account_id,
            ChargeSubject::Appointment(appointment_id),
            self.appointment_fee,
            description,
        );
        self.add_transaction(transaction, auth_token).await
    }

    pub async fn charge_prescription(
        &self,
        account_id: i64,
        prescription_id: i64,
        amount: Decimal,
        description: impl Into<String>,
        auth_token: &str,
    ) -> Result<AccountTransaction, LedgerError> {
        let transaction = NewTransaction::charge(
            account_id,
            ChargeSubject::Prescription(prescription_id),
            amount,
            description,
        );
        self.add_transaction(transaction, auth_token).await
    }

    // ==============================================================================
    // REFUNDS
    // ==============================================================================

    /// Reverses the fee charged for an appointment.
    ///
    /// Returns `Ok(None)` when nothing is left to refund.
    pub async fn refund_appointment(
        &self,
        account_id: i64,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Option<AccountTransaction>, LedgerError> {
        self.refund(
            account_id,
            ChargeSubject::Appointment(appointment_id),
            Some(self.appointment_fee),
            auth_token,
        ).await
    }

    /// Reverses a prescription charge. `expected_amount` (price times quantity)
    /// enables matching an unlinked charge when no linked one exists.
    pub async fn refund_prescription(
        &self,
        account_id: i64,
        prescription_id: i64,
        expected_amount: Option<Decimal>,
        auth_token: &str,
    ) -> Result<Option<AccountTransaction>, LedgerError> {
        self.refund(
            account_id,
            ChargeSubject::Prescription(prescription_id),
            expected_amount,
            auth_token,
        ).await
    }

    async fn refund(
        &self,
        account_id: i64,
        subject: ChargeSubject,
        expected_amount: Option<Decimal>,
        auth_token: &str,
    ) -> Result<Option<AccountTransaction>, LedgerError> {
        let account = self
            .get_account(account_id, auth_token)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let transactions = self.get_transactions(account_id, auth_token).await?;

        let original = match resolve_original_charge(&transactions, subject, expected_amount) {
            ChargeResolution::Linked(tx) => tx,
            ChargeResolution::Orphan(tx) => {
                warn!(
                    "No charge linked to {} on account {}; reversing unlinked {} charge {} of {}",
                    subject, account_id, tx.transaction_type, tx.id, tx.amount
                );
                tx
            }
            ChargeResolution::AlreadyRefunded => {
                info!("Charge for {} on account {} was already refunded", subject, account_id);
                return Ok(None);
            }
            ChargeResolution::NotFound => {
                info!("No charge found for {} on account {}, nothing to refund", subject, account_id);
                return Ok(None);
            }
        };

        let refund = NewTransaction::refund_of(original, subject);
        let row = self.insert_transaction(&refund, auth_token).await?;
        self.settle_balance(account, &row, auth_token).await;

        info!(
            "Refunded {} for {} on account {} (reverses transaction {})",
            -row.amount, subject, account_id, original.id
        );

        Ok(Some(row))
    }

    // ==============================================================================
    // RECONCILIATION
    // ==============================================================================

    /// Recomputes the balance from the ledger rows and corrects the stored
    /// balance when they disagree.
    pub async fn reconcile_account(
        &self,
        account_id: i64,
        auth_token: &str,
    ) -> Result<ReconciliationReport, LedgerError> {
        let account = self
            .get_account(account_id, auth_token)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let transactions = self.get_transactions(account_id, auth_token).await?;
        let recomputed = ledger_balance(&transactions)?;
        let drift = account.balance - recomputed;

        let corrected = if drift.is_zero() {
            false
        } else {
            warn!(
                "Account {} balance {} disagrees with ledger total {} (drift {})",
                account_id, account.balance, recomputed, drift
            );
            self.compare_and_set_balance(&account, recomputed, auth_token)
                .await?
                .ok_or(LedgerError::ConcurrentUpdate(account_id))?;
            true
        };

        Ok(ReconciliationReport {
            account_id,
            previous_balance: account.balance,
            recomputed_balance: recomputed,
            drift,
            corrected,
            transaction_count: transactions.len(),
        })
    }

    // ==============================================================================
    // INTERNALS
    // ==============================================================================

    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
        auth_token: &str,
    ) -> Result<AccountTransaction, LedgerError> {
        let mut body = serde_json::to_value(transaction)?;
        body["transaction_date"] = json!(Utc::now().to_rfc3339());

        let rows: Vec<AccountTransaction> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/account_transactions",
            Some(self.supabase.privileged_token(auth_token)),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        rows.into_iter().next().ok_or_else(|| {
            LedgerError::DatabaseError(format!(
                "Insert of {} transaction on account {} returned no row",
                transaction.transaction_type, transaction.account_id
            ))
        })
    }

    /// Moves the balance for a row that is already in the ledger. The row is
    /// the source of truth, so a failed swap is logged rather than returned.
    async fn settle_balance(&self, account: Account, row: &AccountTransaction, auth_token: &str) {
        match self.apply_balance_delta(account, row.amount, auth_token).await {
            Ok(updated) => debug!("Account {} balance is now {}", updated.id, updated.balance),
            Err(LedgerError::ConcurrentUpdate(account_id)) => warn!(
                "Gave up moving balance of account {} by {} for transaction {}; reconcile the account",
                account_id, row.amount, row.id
            ),
            Err(e) => error!(
                "Balance of account {} not updated for transaction {}: {}; reconcile the account",
                row.account_id, row.id, e
            ),
        }
    }

    async fn apply_balance_delta(
        &self,
        account: Account,
        delta: Decimal,
        auth_token: &str,
    ) -> Result<Account, LedgerError> {
        let account_id = account.id;
        let mut current = account;

        for attempt in 1..=MAX_BALANCE_ATTEMPTS {
            let new_balance = apply_delta(current.balance, delta)?;
            if let Some(updated) = self.compare_and_set_balance(&current, new_balance, auth_token).await? {
                return Ok(updated);
            }

            warn!(
                "Balance of account {} changed underneath us (attempt {}/{})",
                account_id, attempt, MAX_BALANCE_ATTEMPTS
            );
            current = self
                .get_account(account_id, auth_token)
                .await?
                .ok_or(LedgerError::AccountNotFound(account_id))?;
        }

        Err(LedgerError::ConcurrentUpdate(account_id))
    }

    /// Writes `new_balance` only if the stored balance still equals the one
    /// in `expected`. `None` means another writer got there first.
    async fn compare_and_set_balance(
        &self,
        expected: &Account,
        new_balance: Decimal,
        auth_token: &str,
    ) -> Result<Option<Account>, LedgerError> {
        let path = format!(
            "/rest/v1/accounts?id=eq.{}&balance=eq.{}",
            expected.id, expected.balance
        );

        let rows: Vec<Account> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(self.supabase.privileged_token(auth_token)),
            Some(json!({
                "balance": new_balance,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        Ok(rows.into_iter().next())
    }
}

