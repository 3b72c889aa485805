use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of an inbox notification.
///
/// This is the wire-format version. For database operations, see
/// `oskx_core::entities::notification::NotificationKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewExchangeRequest,
    ExchangeAccepted,
    ExchangeDeclined,
    ExchangeStatusChange,
    PointsDeducted,
    PointsAwarded,
    NewRating,
}

/// A single inbox notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub notification_id: Uuid,
    pub kind: NotificationKind,
    /// Kind-specific payload (exchange id, amount, names, ...).
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: i64,
}

/// Response of the unread-count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}
