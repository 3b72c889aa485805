//! Postgres store.
//!
//! Queries use the runtime sqlx API; the schema lives in the workspace
//! `migrations/` directory and is applied with `sqlx::migrate!` by the
//! server's `--migrate` flag.

use super::{
    ExchangeStore, MessageStore, NotificationStore, Page, Paged, RatingStore, StoreError,
    TransactionStore, UserStore,
};
use crate::entities::{
    Exchange, ExchangeStatus, Message, Notification, Rating, TransactionRecord, UserRecord,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:InsertUser")]
    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, points_balance, average_rating)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user.user_id)
        .bind(user.display_name.as_str())
        .bind(user.points_balance)
        .bind(user.average_rating)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:FindUser")]
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT user_id, display_name, points_balance, average_rating
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:SetPointsBalance")]
    async fn set_points_balance(&self, user_id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET points_balance = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(balance)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:SetAverageRating")]
    async fn set_average_rating(&self, user_id: Uuid, value: Decimal) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET average_rating = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ExchangeStore for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:InsertExchange")]
    async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exchanges (
                exchange_id, requester_id, provider_id, skill_id, skill_label,
                skill_level, description, session_type, hourly_rate, duration_hours,
                total_cost, scheduled_date, is_mutual_exchange, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(exchange.exchange_id)
        .bind(exchange.requester_id)
        .bind(exchange.provider_id)
        .bind(exchange.skill_id)
        .bind(exchange.skill_label.as_str())
        .bind(exchange.skill_level.as_deref())
        .bind(exchange.description.as_deref())
        .bind(exchange.session_type.as_deref())
        .bind(exchange.hourly_rate)
        .bind(exchange.duration_hours)
        .bind(exchange.total_cost)
        .bind(exchange.scheduled_date)
        .bind(exchange.is_mutual_exchange)
        .bind(exchange.status)
        .bind(exchange.created_at)
        .bind(exchange.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:FindExchange")]
    async fn find_exchange(&self, exchange_id: Uuid) -> Result<Option<Exchange>, StoreError> {
        let exchange = sqlx::query_as::<_, Exchange>(
            "SELECT * FROM exchanges WHERE exchange_id = $1",
        )
        .bind(exchange_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exchange)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:ListExchangesFor")]
    async fn list_exchanges_for(&self, user_id: Uuid) -> Result<Vec<Exchange>, StoreError> {
        let exchanges = sqlx::query_as::<_, Exchange>(
            r#"
            SELECT * FROM exchanges
            WHERE requester_id = $1 OR provider_id = $1
            ORDER BY created_at DESC, exchange_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exchanges)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:UpdateExchangeStatus")]
    async fn update_status(
        &self,
        exchange_id: Uuid,
        expected: ExchangeStatus,
        target: ExchangeStatus,
        updated_at: time::OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE exchanges
            SET status = $3, updated_at = $4
            WHERE exchange_id = $1 AND status = $2
            "#,
        )
        .bind(exchange_id)
        .bind(expected)
        .bind(target)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:AppendTransaction")]
    async fn append_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_id, user_id, kind, amount, reason,
                related_exchange_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.transaction_id)
        .bind(record.user_id)
        .bind(record.kind)
        .bind(record.amount)
        .bind(record.reason.as_str())
        .bind(record.related_exchange_id)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:TransactionsOf")]
    async fn transactions_of(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Paged<TransactionRecord>, StoreError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, transaction_id DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(page.offset as i64)
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged {
            items,
            total: total as u64,
        })
    }

    #[tracing::instrument(skip_all, err, name = "SQL:TransactionsBetween")]
    async fn transactions_between(
        &self,
        user_id: Uuid,
        from: time::OffsetDateTime,
        until: time::OffsetDateTime,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let items = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at ASC, transaction_id ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:AppendMessage")]
    async fn append_message(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (message_id, exchange_id, sender_id, content, kind, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.message_id)
        .bind(message.exchange_id)
        .bind(message.sender_id)
        .bind(message.content.as_str())
        .bind(message.kind)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:MessagesOf")]
    async fn messages_of(&self, exchange_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE exchange_id = $1
            ORDER BY created_at ASC, message_id ASC
            "#,
        )
        .bind(exchange_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}

#[async_trait]
impl RatingStore for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:InsertRating")]
    async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ratings (
                rating_id, exchange_id, rater_id, rated_user_id,
                score, review_text, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(rating.rating_id)
        .bind(rating.exchange_id)
        .bind(rating.rater_id)
        .bind(rating.rated_user_id)
        .bind(rating.score)
        .bind(rating.review_text.as_deref())
        .bind(rating.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:RatingForExchange")]
    async fn rating_for_exchange(&self, exchange_id: Uuid) -> Result<Option<Rating>, StoreError> {
        let rating = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE exchange_id = $1",
        )
        .bind(exchange_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:RatingsOfUser")]
    async fn ratings_of_user(&self, user_id: Uuid) -> Result<Vec<Rating>, StoreError> {
        let ratings = sqlx::query_as::<_, Rating>(
            r#"
            SELECT * FROM ratings
            WHERE rated_user_id = $1
            ORDER BY created_at ASC, rating_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    #[tracing::instrument(skip_all, err, name = "SQL:AppendNotification")]
    async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                notification_id, user_id, kind, payload, is_read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.notification_id)
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.payload)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:NotificationsOf")]
    async fn notifications_of(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, notification_id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:UnreadCount")]
    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:MarkNotificationRead")]
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:MarkAllNotificationsRead")]
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:DeleteNotification")]
    async fn delete_notification(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
