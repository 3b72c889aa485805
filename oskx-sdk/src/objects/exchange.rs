use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an exchange.
///
/// This is the wire-format version. For database operations, see
/// `oskx_core::entities::exchange::ExchangeStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::InProgress => "in_progress",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Error returned when a status string does not name a known status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown exchange status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for ExchangeStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExchangeStatus::Pending),
            "accepted" => Ok(ExchangeStatus::Accepted),
            "in_progress" => Ok(ExchangeStatus::InProgress),
            "completed" => Ok(ExchangeStatus::Completed),
            "cancelled" => Ok(ExchangeStatus::Cancelled),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Kind of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    System,
}

/// Request payload for opening a new exchange.
///
/// The acting user becomes the requester; `provider_id` names the user whose
/// skill is being requested. The cost (`hourly_rate * duration_hours`) is
/// escrowed from the requester on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExchangeRequest {
    pub provider_id: Uuid,
    pub skill_id: Uuid,
    pub skill_label: String,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub session_type: Option<String>,
    pub hourly_rate: Decimal,
    pub duration_hours: Decimal,
    /// Unix timestamp of the agreed session start, if already scheduled.
    #[serde(default)]
    pub scheduled_date: Option<i64>,
    #[serde(default)]
    pub is_mutual_exchange: bool,
}

/// Request payload for the generic status-change operation.
///
/// The status is carried as a string so that unknown values can be rejected
/// with a dedicated error instead of a generic deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

/// Request payload for sending a chat message within an exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
}

/// Request payload for rating a completed exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateExchangeRequest {
    pub rated_user_id: Uuid,
    pub score: u8,
    #[serde(default)]
    pub review_text: Option<String>,
}

/// An exchange as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub exchange_id: Uuid,
    pub requester_id: Uuid,
    pub provider_id: Uuid,
    pub skill_id: Uuid,
    pub skill_label: String,
    pub skill_level: Option<String>,
    pub description: Option<String>,
    pub session_type: Option<String>,
    pub hourly_rate: Decimal,
    pub duration_hours: Decimal,
    /// `hourly_rate * duration_hours`, fixed at creation time.
    pub total_cost: Decimal,
    pub scheduled_date: Option<i64>,
    pub is_mutual_exchange: bool,
    pub status: ExchangeStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An exchange together with its conversation and ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeDetailResponse {
    #[serde(flatten)]
    pub exchange: ExchangeResponse,
    /// Messages in creation order (oldest first).
    pub messages: Vec<MessageResponse>,
    pub ratings: Vec<RatingResponse>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message_id: Uuid,
    pub exchange_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: i64,
}

/// A rating left by the requester of a completed exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingResponse {
    pub rating_id: Uuid,
    pub exchange_id: Uuid,
    pub rater_id: Uuid,
    pub rated_user_id: Uuid,
    pub score: u8,
    pub review_text: Option<String>,
    pub created_at: i64,
}
