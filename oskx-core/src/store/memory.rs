//! In-memory store.
//!
//! Backs the engine in tests and in single-node deployments without a
//! database. One `RwLock` guards all collections, which gives every
//! trait method insert atomicity for free.

use super::{
    ExchangeStore, MessageStore, NotificationStore, Page, Paged, RatingStore, StoreError,
    TransactionStore, UserStore,
};
use crate::entities::{
    Exchange, ExchangeStatus, Message, Notification, Rating, TransactionRecord, UserRecord,
};
use async_trait::async_trait;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    exchanges: HashMap<Uuid, Exchange>,
    transactions: Vec<TransactionRecord>,
    messages: Vec<Message>,
    ratings: Vec<Rating>,
    notifications: Vec<Notification>,
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn set_points_balance(&self, user_id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.points_balance = balance;
        }
        Ok(())
    }

    async fn set_average_rating(&self, user_id: Uuid, value: Decimal) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.average_rating = Some(value);
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeStore for MemoryStore {
    async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.exchanges.insert(exchange.exchange_id, exchange.clone());
        Ok(())
    }

    async fn find_exchange(&self, exchange_id: Uuid) -> Result<Option<Exchange>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.exchanges.get(&exchange_id).cloned())
    }

    async fn list_exchanges_for(&self, user_id: Uuid) -> Result<Vec<Exchange>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .exchanges
            .values()
            .filter(|e| e.is_party(user_id))
            .cloned()
            .sorted_by_key(|e| std::cmp::Reverse((e.created_at, e.exchange_id)))
            .collect())
    }

    async fn update_status(
        &self,
        exchange_id: Uuid,
        expected: ExchangeStatus,
        target: ExchangeStatus,
        updated_at: time::OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.exchanges.get_mut(&exchange_id) {
            Some(e) if e.status == expected => {
                e.status = target;
                e.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn append_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.transactions.push(record.clone());
        Ok(())
    }

    async fn transactions_of(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Paged<TransactionRecord>, StoreError> {
        let inner = self.inner.read().await;
        let all: Vec<TransactionRecord> = inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .sorted_by_key(|t| std::cmp::Reverse((t.created_at, t.transaction_id)))
            .collect();
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Paged { items, total })
    }

    async fn transactions_between(
        &self,
        user_id: Uuid,
        from: time::OffsetDateTime,
        until: time::OffsetDateTime,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id && t.created_at >= from && t.created_at < until)
            .cloned()
            .sorted_by_key(|t| (t.created_at, t.transaction_id))
            .collect())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.messages.push(message.clone());
        Ok(())
    }

    async fn messages_of(&self, exchange_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.exchange_id == exchange_id)
            .cloned()
            .sorted_by_key(|m| (m.created_at, m.message_id))
            .collect())
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.ratings.push(rating.clone());
        Ok(())
    }

    async fn rating_for_exchange(&self, exchange_id: Uuid) -> Result<Option<Rating>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .iter()
            .find(|r| r.exchange_id == exchange_id)
            .cloned())
    }

    async fn ratings_of_user(&self, user_id: Uuid) -> Result<Vec<Rating>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.rated_user_id == user_id)
            .cloned()
            .sorted_by_key(|r| (r.created_at, r.rating_id))
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.notifications.push(notification.clone());
        Ok(())
    }

    async fn notifications_of(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Notification>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .sorted_by_key(|n| std::cmp::Reverse((n.created_at, n.notification_id)))
            .take(limit as usize)
            .collect())
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.notification_id == notification_id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut updated = 0;
        for n in inner
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.notification_id == notification_id && n.user_id == user_id));
        Ok(inner.notifications.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ExchangeTerms, MessageKind, NotificationKind, TransactionKind};
    use rust_decimal_macros::dec;

    fn user(id: u128, balance: Decimal) -> UserRecord {
        UserRecord {
            user_id: Uuid::from_u128(id),
            display_name: "someone".into(),
            points_balance: balance,
            average_rating: None,
        }
    }

    fn terms() -> ExchangeTerms {
        ExchangeTerms {
            skill_id: Uuid::now_v7(),
            skill_label: "Rust mentoring".into(),
            skill_level: Some("Advanced".into()),
            description: None,
            session_type: None,
            hourly_rate: dec!(25),
            duration_hours: dec!(2),
            scheduled_date: None,
            is_mutual_exchange: false,
        }
    }

    #[tokio::test]
    async fn status_cas_rejects_stale_expectation() {
        let store = MemoryStore::new();
        let exchange = Exchange::new(Uuid::from_u128(1), Uuid::from_u128(2), terms());
        let id = exchange.exchange_id;
        store.insert_exchange(&exchange).await.unwrap();

        let now = time::OffsetDateTime::now_utc();
        assert!(
            store
                .update_status(id, ExchangeStatus::Pending, ExchangeStatus::Accepted, now)
                .await
                .unwrap()
        );
        // Second writer still expects Pending and must lose.
        assert!(
            !store
                .update_status(id, ExchangeStatus::Pending, ExchangeStatus::Cancelled, now)
                .await
                .unwrap()
        );
        let stored = store.find_exchange(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExchangeStatus::Accepted);
    }

    #[tokio::test]
    async fn messages_come_back_in_creation_order() {
        let store = MemoryStore::new();
        let exchange_id = Uuid::from_u128(7);
        let sender = Uuid::from_u128(1);
        for i in 0..5 {
            let msg = Message::new(exchange_id, sender, format!("msg {i}"), MessageKind::Text);
            store.append_message(&msg).await.unwrap();
        }
        let messages = store.messages_of(exchange_id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test]
    async fn transaction_pagination_reports_total() {
        let store = MemoryStore::new();
        let uid = Uuid::from_u128(1);
        for i in 0..7 {
            let tx = TransactionRecord::new(
                uid,
                TransactionKind::Award,
                Decimal::from(i),
                "seed".into(),
                None,
            );
            store.append_transaction(&tx).await.unwrap();
        }
        let page = store
            .transactions_of(
                uid,
                Page {
                    offset: 5,
                    limit: 5,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn notification_scoping_hides_other_users_entries() {
        let store = MemoryStore::new();
        let owner = Uuid::from_u128(1);
        let stranger = Uuid::from_u128(2);
        let n = Notification::new(
            owner,
            NotificationKind::PointsAwarded,
            serde_json::json!({"amount": "50"}),
        );
        store.append_notification(&n).await.unwrap();

        assert!(!store.mark_read(n.notification_id, stranger).await.unwrap());
        assert!(
            !store
                .delete_notification(n.notification_id, stranger)
                .await
                .unwrap()
        );
        assert_eq!(store.unread_count(owner).await.unwrap(), 1);

        assert!(store.mark_read(n.notification_id, owner).await.unwrap());
        assert_eq!(store.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn balance_updates_are_visible() {
        let store = MemoryStore::new();
        let u = user(1, dec!(100));
        store.insert_user(&u).await.unwrap();
        store
            .set_points_balance(u.user_id, dec!(42.5))
            .await
            .unwrap();
        let stored = store.find_user(u.user_id).await.unwrap().unwrap();
        assert_eq!(stored.points_balance, dec!(42.5));
    }
}
