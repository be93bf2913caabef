pub mod ledger;
pub mod reconciliation;

pub use ledger::LedgerService;
