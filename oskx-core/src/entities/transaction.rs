use compact_str::CompactString;
use oskx_sdk::objects::TransactionKind as SdkTransactionKind;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Kind of a ledger entry.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `oskx_sdk::objects::TransactionKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "transaction_kind")]
pub enum TransactionKind {
    Payment,
    Award,
}

impl From<TransactionKind> for SdkTransactionKind {
    fn from(value: TransactionKind) -> Self {
        match value {
            TransactionKind::Payment => SdkTransactionKind::Payment,
            TransactionKind::Award => SdkTransactionKind::Award,
        }
    }
}

impl From<SdkTransactionKind> for TransactionKind {
    fn from(value: SdkTransactionKind) -> Self {
        match value {
            SdkTransactionKind::Payment => TransactionKind::Payment,
            SdkTransactionKind::Award => TransactionKind::Award,
        }
    }
}

/// A single entry in the append-only points ledger.
///
/// Entries are never mutated or deleted; the signed sum of a user's
/// entries reconciles to their current balance.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Unsigned magnitude; the sign is implied by `kind`.
    pub amount: Decimal,
    pub reason: CompactString,
    pub related_exchange_id: Option<Uuid>,
    pub created_at: time::OffsetDateTime,
}

impl TransactionRecord {
    pub fn new(
        user_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        reason: CompactString,
        related_exchange_id: Option<Uuid>,
    ) -> Self {
        Self {
            transaction_id: Uuid::now_v7(),
            user_id,
            kind,
            amount,
            reason,
            related_exchange_id,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    /// Amount with its sign applied: negative for `Payment`, positive for
    /// `Award`.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Payment => -self.amount,
            TransactionKind::Award => self.amount,
        }
    }
}
