use oskx_sdk::objects::NotificationKind as SdkNotificationKind;
use uuid::Uuid;

/// Kind of an inbox notification.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `oskx_sdk::objects::NotificationKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "notification_kind")]
pub enum NotificationKind {
    NewExchangeRequest,
    ExchangeAccepted,
    ExchangeDeclined,
    ExchangeStatusChange,
    PointsDeducted,
    PointsAwarded,
    NewRating,
}

impl From<NotificationKind> for SdkNotificationKind {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::NewExchangeRequest => SdkNotificationKind::NewExchangeRequest,
            NotificationKind::ExchangeAccepted => SdkNotificationKind::ExchangeAccepted,
            NotificationKind::ExchangeDeclined => SdkNotificationKind::ExchangeDeclined,
            NotificationKind::ExchangeStatusChange => SdkNotificationKind::ExchangeStatusChange,
            NotificationKind::PointsDeducted => SdkNotificationKind::PointsDeducted,
            NotificationKind::PointsAwarded => SdkNotificationKind::PointsAwarded,
            NotificationKind::NewRating => SdkNotificationKind::NewRating,
        }
    }
}

impl From<SdkNotificationKind> for NotificationKind {
    fn from(value: SdkNotificationKind) -> Self {
        match value {
            SdkNotificationKind::NewExchangeRequest => NotificationKind::NewExchangeRequest,
            SdkNotificationKind::ExchangeAccepted => NotificationKind::ExchangeAccepted,
            SdkNotificationKind::ExchangeDeclined => NotificationKind::ExchangeDeclined,
            SdkNotificationKind::ExchangeStatusChange => NotificationKind::ExchangeStatusChange,
            SdkNotificationKind::PointsDeducted => NotificationKind::PointsDeducted,
            SdkNotificationKind::PointsAwarded => NotificationKind::PointsAwarded,
            SdkNotificationKind::NewRating => NotificationKind::NewRating,
        }
    }
}

/// A durable inbox entry. Only `is_read` ever changes; the owning user
/// may delete it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: time::OffsetDateTime,
}

impl Notification {
    pub fn new(user_id: Uuid, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self {
            notification_id: Uuid::now_v7(),
            user_id,
            kind,
            payload,
            is_read: false,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }
}
