//! The points ledger.
//!
//! Owns every mutation of `points_balance`. Each debit/credit is a
//! read-check-mutate-append sequence serialized per user id with a keyed
//! lock, so concurrent operations on the same user can never lose an
//! update or drive the balance below zero. The transaction log is
//! append-only; the signed sum of a user's entries always reconciles to
//! the stored balance. A balance write whose log append fails is rolled
//! back before the error propagates, so a failed operation leaves both
//! sides untouched.

use crate::entities::{TransactionKind, TransactionRecord};
use crate::error::EngineError;
use crate::store::{Page, Paged, Store, StoreError};
use crate::utils::keyed_lock::KeyedLocks;
use compact_str::CompactString;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
    locks: Arc<KeyedLocks<Uuid>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Atomically check the balance and deduct `amount`, appending a
    /// `Payment` entry tagged to `related_exchange_id`.
    #[tracing::instrument(skip(self, reason), err, name = "Ledger:Debit")]
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        reason: CompactString,
        related_exchange_id: Option<Uuid>,
    ) -> Result<TransactionRecord, EngineError> {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "debit amount must not be negative".to_owned(),
            ));
        }
        let _guard = self.locks.acquire(user_id).await;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(EngineError::NotFound("user"))?;
        if user.points_balance < amount {
            return Err(EngineError::InsufficientFunds {
                needed: amount,
                available: user.points_balance,
            });
        }

        self.store
            .set_points_balance(user_id, user.points_balance - amount)
            .await?;
        let record = TransactionRecord::new(
            user_id,
            TransactionKind::Payment,
            amount,
            reason,
            related_exchange_id,
        );
        if let Err(e) = self.store.append_transaction(&record).await {
            self.restore_balance(user_id, user.points_balance, &e).await;
            return Err(e.into());
        }
        Ok(record)
    }

    /// Atomically add `amount` to the balance, appending an `Award`
    /// entry. No upper bound.
    #[tracing::instrument(skip(self, reason), err, name = "Ledger:Credit")]
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        reason: CompactString,
        related_exchange_id: Option<Uuid>,
    ) -> Result<TransactionRecord, EngineError> {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidInput(
                "credit amount must not be negative".to_owned(),
            ));
        }
        let _guard = self.locks.acquire(user_id).await;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(EngineError::NotFound("user"))?;
        self.store
            .set_points_balance(user_id, user.points_balance + amount)
            .await?;
        let record = TransactionRecord::new(
            user_id,
            TransactionKind::Award,
            amount,
            reason,
            related_exchange_id,
        );
        if let Err(e) = self.store.append_transaction(&record).await {
            self.restore_balance(user_id, user.points_balance, &e).await;
            return Err(e.into());
        }
        Ok(record)
    }

    /// Put the balance back after a failed log append so it keeps
    /// reconciling with the transaction log. Runs under the caller's
    /// per-user lock. If the restore itself fails the divergence is
    /// surfaced loudly for operator reconciliation.
    async fn restore_balance(&self, user_id: Uuid, previous: Decimal, cause: &StoreError) {
        tracing::error!(
            error = %cause,
            %user_id,
            "transaction append failed after balance write, restoring balance"
        );
        if let Err(e) = self.store.set_points_balance(user_id, previous).await {
            tracing::error!(
                error = %e,
                %user_id,
                "balance restore failed, balance diverges from transaction log"
            );
        }
    }

    pub async fn balance_of(&self, user_id: Uuid) -> Result<Decimal, EngineError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(EngineError::NotFound("user"))?;
        Ok(user.points_balance)
    }

    /// Transaction history, newest first.
    pub async fn transactions_of(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Paged<TransactionRecord>, EngineError> {
        Ok(self.store.transactions_of(user_id, page).await?)
    }

    /// Audit query over the immutable log, oldest first.
    pub async fn transactions_between(
        &self,
        user_id: Uuid,
        from: time::OffsetDateTime,
        until: time::OffsetDateTime,
    ) -> Result<Vec<TransactionRecord>, EngineError> {
        Ok(self.store.transactions_between(user_id, from, until).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        Exchange, ExchangeStatus, Message, Notification, Rating, UserRecord,
    };
    use crate::store::{
        ExchangeStore, MemoryStore, MessageStore, NotificationStore, RatingStore,
        TransactionStore, UserStore,
    };
    use rust_decimal_macros::dec;

    async fn ledger_with_user(balance: Decimal) -> (Ledger, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::now_v7();
        store
            .insert_user(&UserRecord {
                user_id,
                display_name: "alice".into(),
                points_balance: balance,
                average_rating: None,
            })
            .await
            .unwrap();
        (Ledger::new(store), user_id)
    }

    #[tokio::test]
    async fn debit_checks_balance() {
        let (ledger, user) = ledger_with_user(dec!(100)).await;

        ledger.debit(user, dec!(60), "spend".into(), None).await.unwrap();
        assert_eq!(ledger.balance_of(user).await.unwrap(), dec!(40));

        let err = ledger
            .debit(user, dec!(41), "spend".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        // Failed debit must not append anything.
        let page = ledger.transactions_of(user, Page::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn balance_reconciles_with_signed_sum() {
        let (ledger, user) = ledger_with_user(dec!(100)).await;

        ledger.debit(user, dec!(30), "a".into(), None).await.unwrap();
        ledger.credit(user, dec!(12.5), "b".into(), None).await.unwrap();
        ledger.debit(user, dec!(0.5), "c".into(), None).await.unwrap();

        let page = ledger
            .transactions_of(user, Page { offset: 0, limit: 100 })
            .await
            .unwrap();
        let signed_sum: Decimal = page.items.iter().map(|t| t.signed_amount()).sum();
        assert_eq!(
            dec!(100) + signed_sum,
            ledger.balance_of(user).await.unwrap()
        );
    }

    #[tokio::test]
    async fn concurrent_debits_never_overdraw() {
        let (ledger, user) = ledger_with_user(dec!(100)).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.debit(user, dec!(30), "race".into(), None).await
            }));
        }

        let mut won = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                won += 1;
            }
        }
        // 100 points only cover three debits of 30.
        assert_eq!(won, 3);
        assert_eq!(ledger.balance_of(user).await.unwrap(), dec!(10));
    }

    #[tokio::test]
    async fn audit_window_is_half_open_and_oldest_first() {
        let (ledger, user) = ledger_with_user(dec!(100)).await;

        let before = time::OffsetDateTime::now_utc();
        ledger.debit(user, dec!(10), "a".into(), None).await.unwrap();
        ledger.credit(user, dec!(5), "b".into(), None).await.unwrap();
        let mid = time::OffsetDateTime::now_utc();
        ledger.debit(user, dec!(1), "c".into(), None).await.unwrap();
        let after = time::OffsetDateTime::now_utc();

        let window = ledger.transactions_between(user, before, mid).await.unwrap();
        let reasons: Vec<&str> = window.iter().map(|t| t.reason.as_str()).collect();
        assert_eq!(reasons, vec!["a", "b"]);

        // The upper bound is exclusive.
        let all = ledger.transactions_between(user, before, after).await.unwrap();
        assert_eq!(all.len(), 3);
        let empty = ledger.transactions_between(user, after, after).await.unwrap();
        assert!(empty.is_empty());
    }

    /// Delegates to a [`MemoryStore`] but refuses every transaction
    /// append, simulating a storage failure between the balance write
    /// and the log write.
    struct AppendlessStore(MemoryStore);

    #[async_trait::async_trait]
    impl UserStore for AppendlessStore {
        async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
            self.0.insert_user(user).await
        }
        async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
            self.0.find_user(user_id).await
        }
        async fn set_points_balance(
            &self,
            user_id: Uuid,
            balance: Decimal,
        ) -> Result<(), StoreError> {
            self.0.set_points_balance(user_id, balance).await
        }
        async fn set_average_rating(
            &self,
            user_id: Uuid,
            value: Decimal,
        ) -> Result<(), StoreError> {
            self.0.set_average_rating(user_id, value).await
        }
    }

    #[async_trait::async_trait]
    impl TransactionStore for AppendlessStore {
        async fn append_transaction(&self, _record: &TransactionRecord) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn transactions_of(
            &self,
            user_id: Uuid,
            page: Page,
        ) -> Result<Paged<TransactionRecord>, StoreError> {
            self.0.transactions_of(user_id, page).await
        }
        async fn transactions_between(
            &self,
            user_id: Uuid,
            from: time::OffsetDateTime,
            until: time::OffsetDateTime,
        ) -> Result<Vec<TransactionRecord>, StoreError> {
            self.0.transactions_between(user_id, from, until).await
        }
    }

    #[async_trait::async_trait]
    impl ExchangeStore for AppendlessStore {
        async fn insert_exchange(&self, exchange: &Exchange) -> Result<(), StoreError> {
            self.0.insert_exchange(exchange).await
        }
        async fn find_exchange(&self, exchange_id: Uuid) -> Result<Option<Exchange>, StoreError> {
            self.0.find_exchange(exchange_id).await
        }
        async fn list_exchanges_for(&self, user_id: Uuid) -> Result<Vec<Exchange>, StoreError> {
            self.0.list_exchanges_for(user_id).await
        }
        async fn update_status(
            &self,
            exchange_id: Uuid,
            expected: ExchangeStatus,
            target: ExchangeStatus,
            updated_at: time::OffsetDateTime,
        ) -> Result<bool, StoreError> {
            self.0
                .update_status(exchange_id, expected, target, updated_at)
                .await
        }
    }

    #[async_trait::async_trait]
    impl MessageStore for AppendlessStore {
        async fn append_message(&self, message: &Message) -> Result<(), StoreError> {
            self.0.append_message(message).await
        }
        async fn messages_of(&self, exchange_id: Uuid) -> Result<Vec<Message>, StoreError> {
            self.0.messages_of(exchange_id).await
        }
    }

    #[async_trait::async_trait]
    impl RatingStore for AppendlessStore {
        async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError> {
            self.0.insert_rating(rating).await
        }
        async fn rating_for_exchange(
            &self,
            exchange_id: Uuid,
        ) -> Result<Option<Rating>, StoreError> {
            self.0.rating_for_exchange(exchange_id).await
        }
        async fn ratings_of_user(&self, user_id: Uuid) -> Result<Vec<Rating>, StoreError> {
            self.0.ratings_of_user(user_id).await
        }
    }

    #[async_trait::async_trait]
    impl NotificationStore for AppendlessStore {
        async fn append_notification(&self, notification: &Notification) -> Result<(), StoreError> {
            self.0.append_notification(notification).await
        }
        async fn notifications_of(
            &self,
            user_id: Uuid,
            limit: u64,
        ) -> Result<Vec<Notification>, StoreError> {
            self.0.notifications_of(user_id, limit).await
        }
        async fn unread_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
            self.0.unread_count(user_id).await
        }
        async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
            self.0.mark_read(notification_id, user_id).await
        }
        async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
            self.0.mark_all_read(user_id).await
        }
        async fn delete_notification(
            &self,
            notification_id: Uuid,
            user_id: Uuid,
        ) -> Result<bool, StoreError> {
            self.0.delete_notification(notification_id, user_id).await
        }
    }

    #[tokio::test]
    async fn failed_append_rolls_the_balance_back() {
        let store = Arc::new(AppendlessStore(MemoryStore::new()));
        let user = Uuid::now_v7();
        store
            .insert_user(&UserRecord {
                user_id: user,
                display_name: "alice".into(),
                points_balance: dec!(100),
                average_rating: None,
            })
            .await
            .unwrap();
        let ledger = Ledger::new(store);

        let err = ledger
            .debit(user, dec!(40), "spend".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(ledger.balance_of(user).await.unwrap(), dec!(100));

        let err = ledger
            .credit(user, dec!(5), "award".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(ledger.balance_of(user).await.unwrap(), dec!(100));

        // Neither failed operation may leave a log entry behind.
        let page = ledger.transactions_of(user, Page::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store);
        let err = ledger
            .credit(Uuid::now_v7(), dec!(1), "x".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound("user")));
    }
}
