//! Storage ports.
//!
//! The engine talks to persistence exclusively through these traits, so
//! services can be wired with an in-memory store in tests and a Postgres
//! store in production. All mutating methods are atomic per call; the
//! read-check-mutate discipline around them lives in the services
//! (keyed locks) and in [`ExchangeStore::update_status`] (compare-and-swap
//! on the expected status).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entities::{
    Exchange, ExchangeStatus, Message, Notification, Rating, TransactionRecord, UserRecord,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Persistence failure, wrapped into `EngineError::Storage` by the
/// services.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Offset/limit pagination request.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// One page of results plus the total count for page-count computation.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError>;
    async fn set_points_balance(&self, user_id: Uuid, balance: Decimal) -> Result<(), StoreError>;
    async fn set_average_rating(&self, user_id: Uuid, value: Decimal) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ExchangeStore: Send + Sync {
    async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), StoreError>;
    async fn find_exchange(&self, exchange_id: Uuid) -> Result<Option<Exchange>, StoreError>;
    /// Every exchange where the user is requester or provider, newest
    /// first.
    async fn list_exchanges_for(&self, user_id: Uuid) -> Result<Vec<Exchange>, StoreError>;
    /// Compare-and-swap status update. Returns `false` if the stored
    /// status no longer equals `expected` (a concurrent writer won).
    async fn update_status(
        &self,
        exchange_id: Uuid,
        expected: ExchangeStatus,
        target: ExchangeStatus,
        updated_at: time::OffsetDateTime,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError>;
    /// Transaction history, newest first.
    async fn transactions_of(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Paged<TransactionRecord>, StoreError>;
    /// Audit query over the immutable log: entries in `[from, until)`,
    /// oldest first.
    async fn transactions_between(
        &self,
        user_id: Uuid,
        from: time::OffsetDateTime,
        until: time::OffsetDateTime,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, message: &Message) -> Result<(), StoreError>;
    /// Messages of an exchange in creation order, id as tie-break.
    async fn messages_of(&self, exchange_id: Uuid) -> Result<Vec<Message>, StoreError>;
}

#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError>;
    async fn rating_for_exchange(&self, exchange_id: Uuid) -> Result<Option<Rating>, StoreError>;
    async fn ratings_of_user(&self, user_id: Uuid) -> Result<Vec<Rating>, StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError>;
    /// The newest `limit` notifications of a user, newest first.
    async fn notifications_of(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Notification>, StoreError>;
    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError>;
    /// Returns `false` if the notification does not exist **or** does not
    /// belong to the user; callers must not distinguish the two.
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError>;
    /// Same ownership scoping as [`NotificationStore::mark_read`].
    async fn delete_notification(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError>;
}

/// The full persistence surface the engine is wired with.
pub trait Store:
    UserStore + ExchangeStore + TransactionStore + MessageStore + RatingStore + NotificationStore
{
}

impl<T> Store for T where
    T: UserStore + ExchangeStore + TransactionStore + MessageStore + RatingStore + NotificationStore
{
}
