use oskx_sdk::objects::MessageKind as SdkMessageKind;
use uuid::Uuid;

/// Kind of a chat message.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `oskx_sdk::objects::MessageKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "message_kind")]
pub enum MessageKind {
    Text,
    System,
}

impl From<MessageKind> for SdkMessageKind {
    fn from(value: MessageKind) -> Self {
        match value {
            MessageKind::Text => SdkMessageKind::Text,
            MessageKind::System => SdkMessageKind::System,
        }
    }
}

impl From<SdkMessageKind> for MessageKind {
    fn from(value: SdkMessageKind) -> Self {
        match value {
            SdkMessageKind::Text => MessageKind::Text,
            SdkMessageKind::System => MessageKind::System,
        }
    }
}

/// A chat message inside an exchange. Append-only, ordered by
/// `created_at` with id as tie-break.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: Uuid,
    pub exchange_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: time::OffsetDateTime,
}

impl Message {
    pub fn new(exchange_id: Uuid, sender_id: Uuid, content: String, kind: MessageKind) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            exchange_id,
            sender_id,
            content,
            kind,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }
}
