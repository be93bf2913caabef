use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::{AccountTransaction, ChargeSubject, LedgerError, TransactionType};

/// Outcome of looking up the charge a refund should reverse.
#[derive(Debug, PartialEq)]
pub enum ChargeResolution<'a> {
    /// An open charge carrying a link to the subject.
    Linked(&'a AccountTransaction),
    /// No linked charge exists; an unlinked charge of the same type and
    /// amount was picked instead.
    Orphan(&'a AccountTransaction),
    /// Every linked charge already has a refund.
    AlreadyRefunded,
    NotFound,
}

impl<'a> ChargeResolution<'a> {
    pub fn charge(&self) -> Option<&'a AccountTransaction> {
        match self {
            ChargeResolution::Linked(tx) | ChargeResolution::Orphan(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Ids of charges that a refund row points at.
pub fn reversed_ids(transactions: &[AccountTransaction]) -> HashSet<i64> {
    transactions
        .iter()
        .filter(|tx| tx.transaction_type == TransactionType::Refund)
        .filter_map(|tx| tx.reversed_transaction_id)
        .collect()
}

fn most_recent<'a>(candidates: impl Iterator<Item = &'a AccountTransaction>) -> Option<&'a AccountTransaction> {
    candidates.max_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then(a.id.cmp(&b.id))
    })
}

/// Picks the charge to reverse for `subject`.
///
/// Linked charges win. Refund rows written before reversal pointers existed
/// are linked to the subject but point at nothing; each of those is taken to
/// have reversed the oldest still-open linked charge. When the subject has
/// no linked charge at all and `expected_amount` is known, the most recent
/// open unlinked charge of the same type with exactly that amount is used.
pub fn resolve_original_charge(
    transactions: &[AccountTransaction],
    subject: ChargeSubject,
    expected_amount: Option<Decimal>,
) -> ChargeResolution<'_> {
    let reversed = reversed_ids(transactions);
    let charge_type = subject.charge_type();

    let mut linked: Vec<&AccountTransaction> = transactions
        .iter()
        .filter(|tx| tx.transaction_type == charge_type && subject.is_linked(tx))
        .collect();

    if !linked.is_empty() {
        linked.sort_by(|a, b| a.transaction_date.cmp(&b.transaction_date).then(a.id.cmp(&b.id)));

        let legacy_refunds = transactions
            .iter()
            .filter(|tx| {
                tx.transaction_type == TransactionType::Refund
                    && tx.reversed_transaction_id.is_none()
                    && subject.is_linked(tx)
            })
            .count();

        let open = linked
            .into_iter()
            .filter(|tx| !reversed.contains(&tx.id))
            .skip(legacy_refunds);

        return match most_recent(open) {
            Some(tx) => ChargeResolution::Linked(tx),
            None => ChargeResolution::AlreadyRefunded,
        };
    }

    let Some(expected) = expected_amount else {
        return ChargeResolution::NotFound;
    };

    let orphans = transactions.iter().filter(|tx| {
        tx.transaction_type == charge_type
            && tx.is_unlinked()
            && tx.amount == expected
            && !reversed.contains(&tx.id)
    });

    match most_recent(orphans) {
        Some(tx) => ChargeResolution::Orphan(tx),
        None => ChargeResolution::NotFound,
    }
}

/// Balance implied by the ledger rows.
pub fn ledger_balance(transactions: &[AccountTransaction]) -> Result<Decimal, LedgerError> {
    transactions.iter().try_fold(Decimal::ZERO, |acc, tx| {
        acc.checked_add(tx.amount)
            .ok_or_else(|| LedgerError::InvalidAmount("Ledger total overflows".to_string()))
    })
}

pub fn apply_delta(balance: Decimal, delta: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(delta)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("Applying {} to {} overflows", delta, balance)))
}
