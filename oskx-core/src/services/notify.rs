//! Notification fan-out.
//!
//! The durable per-user inbox. Appends are engine-internal side effects;
//! read-state toggles and deletes are scoped to the owning user and
//! answer `NotFound` for entries owned by someone else, so existence
//! never leaks. After each append the relay pushes a
//! `NotificationCreated` event to the user's personal topic as a
//! best-effort acceleration.

use crate::entities::{Notification, NotificationKind};
use crate::error::EngineError;
use crate::events::{Relay, RelayEvent, Topic};
use crate::store::Store;
use kanau::processor::Processor;
use std::sync::Arc;
use uuid::Uuid;

/// Default page size when the caller does not specify a limit.
pub const DEFAULT_LIST_LIMIT: u64 = 50;

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn Store>,
    relay: Relay,
}

impl Notifier {
    pub fn new(store: Arc<dyn Store>, relay: Relay) -> Self {
        Self { store, relay }
    }

    /// Append a notification to a user's inbox and push it to connected
    /// sessions.
    pub async fn append(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<Notification, EngineError> {
        let notification = Notification::new(user_id, kind, payload);
        self.store.append_notification(&notification).await?;
        self.relay
            .publish(
                Topic::User(user_id),
                RelayEvent::NotificationCreated {
                    notification: notification.clone(),
                },
            )
            .await;
        Ok(notification)
    }

    /// Best-effort append used by engine side effects: failures are
    /// logged and swallowed so they never fail the primary operation.
    pub async fn notify(&self, user_id: Uuid, kind: NotificationKind, payload: serde_json::Value) {
        if let Err(e) = self.append(user_id, kind, payload).await {
            tracing::warn!(error = %e, %user_id, "failed to append notification");
        }
    }
}

/// List the newest notifications of a user.
#[derive(Debug, Clone)]
pub struct ListNotifications {
    pub user_id: Uuid,
    pub limit: Option<u64>,
}

impl Processor<ListNotifications> for Notifier {
    type Output = Vec<Notification>;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Notify:List")]
    async fn process(&self, msg: ListNotifications) -> Result<Vec<Notification>, EngineError> {
        let limit = msg.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        Ok(self.store.notifications_of(msg.user_id, limit).await?)
    }
}

/// Count a user's unread notifications.
#[derive(Debug, Clone)]
pub struct UnreadNotificationCount {
    pub user_id: Uuid,
}

impl Processor<UnreadNotificationCount> for Notifier {
    type Output = u64;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Notify:UnreadCount")]
    async fn process(&self, msg: UnreadNotificationCount) -> Result<u64, EngineError> {
        Ok(self.store.unread_count(msg.user_id).await?)
    }
}

/// Mark one notification as read, scoped to the owning user.
#[derive(Debug, Clone)]
pub struct MarkNotificationRead {
    pub user_id: Uuid,
    pub notification_id: Uuid,
}

impl Processor<MarkNotificationRead> for Notifier {
    type Output = ();
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Notify:MarkRead")]
    async fn process(&self, msg: MarkNotificationRead) -> Result<(), EngineError> {
        if self
            .store
            .mark_read(msg.notification_id, msg.user_id)
            .await?
        {
            Ok(())
        } else {
            Err(EngineError::NotFound("notification"))
        }
    }
}

/// Mark every notification of a user as read.
#[derive(Debug, Clone)]
pub struct MarkAllNotificationsRead {
    pub user_id: Uuid,
}

impl Processor<MarkAllNotificationsRead> for Notifier {
    type Output = u64;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Notify:MarkAllRead")]
    async fn process(&self, msg: MarkAllNotificationsRead) -> Result<u64, EngineError> {
        Ok(self.store.mark_all_read(msg.user_id).await?)
    }
}

/// Delete one notification, scoped to the owning user.
#[derive(Debug, Clone)]
pub struct DeleteNotification {
    pub user_id: Uuid,
    pub notification_id: Uuid,
}

impl Processor<DeleteNotification> for Notifier {
    type Output = ();
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Notify:Delete")]
    async fn process(&self, msg: DeleteNotification) -> Result<(), EngineError> {
        if self
            .store
            .delete_notification(msg.notification_id, msg.user_id)
            .await?
        {
            Ok(())
        } else {
            Err(EngineError::NotFound("notification"))
        }
    }
}
