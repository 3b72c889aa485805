use compact_str::CompactString;
use rust_decimal::Decimal;
use uuid::Uuid;

/// The slice of a user the engine needs.
///
/// Users are owned by the profile collaborator; the engine only reads
/// them by id and mutates `points_balance` (through the ledger) and
/// `average_rating` (through the rating gate).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub display_name: CompactString,
    pub points_balance: Decimal,
    pub average_rating: Option<Decimal>,
}
