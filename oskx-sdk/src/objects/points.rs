use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a ledger entry.
///
/// `Payment` entries reduce the balance, `Award` entries increase it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Payment,
    Award,
}

/// Current points balance of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub points_balance: Decimal,
}

/// A single append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Unsigned magnitude; the sign is implied by `kind`.
    pub amount: Decimal,
    pub reason: String,
    pub related_exchange_id: Option<Uuid>,
    pub created_at: i64,
}

/// One page of transaction history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionResponse>,
    /// Total number of entries for the user, for page-count computation.
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}
