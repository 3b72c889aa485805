//! WebSocket protocol for the real-time relay.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection tied to the
//! authenticated user. The session is subscribed to the user's personal
//! topic immediately; exchange rooms are joined and left with explicit
//! client frames.
//!
//! # Protocol
//!
//! 1. After the upgrade the server pushes [`WsServerMessage`] JSON frames
//!    for every event published to a topic the session is subscribed to.
//! 2. The client sends [`WsClientMessage`] frames to join or leave
//!    exchange rooms. Joining is authorized: only a party to the exchange
//!    may join its room.
//! 3. Chat broadcasts include the sender's own session, so a client will
//!    receive an echo of its own message carrying the durable id. Clients
//!    must reconcile by id (see [`MessageLog`]) instead of trusting a
//!    local optimistic copy.
//! 4. The relay gives no delivery guarantee across disconnects; after a
//!    reconnect the client must re-fetch the inbox and the exchange
//!    detail, which are the durable sources of truth.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::exchange::{ExchangeStatus, MessageResponse};
use super::notification::NotificationResponse;

/// Client-to-server WebSocket frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    /// Join the room of an exchange the user is a party to.
    JoinExchange { exchange_id: Uuid },
    /// Leave a previously joined exchange room.
    LeaveExchange { exchange_id: Uuid },
}

/// Server-to-client WebSocket frame.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"message_received","message":{ ... }}
/// {"type":"exchange_status_changed","exchange_id":"...","status":"accepted","changed_by":"..."}
/// {"type":"notification_created","notification":{ ... }}
/// {"type":"error","code":4003,"reason":"not a party to this exchange"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// A chat message was persisted and broadcast to the exchange room.
    MessageReceived { message: MessageResponse },

    /// The status of an exchange changed. This is an accelerator only;
    /// the notification inbox remains the durable record.
    ExchangeStatusChanged {
        exchange_id: Uuid,
        status: ExchangeStatus,
        changed_by: Uuid,
    },

    /// A notification was appended to the user's inbox.
    NotificationCreated { notification: NotificationResponse },

    /// A server-side error that does **not** close the connection by
    /// itself.
    Error { code: u16, reason: String },
}

/// Well-known WebSocket close / error codes used by the relay.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The client frame could not be parsed.
    pub const BAD_FRAME: u16 = 4000;

    /// The actor is not a party to the exchange it tried to join.
    pub const FORBIDDEN: u16 = 4003;

    /// The referenced exchange does not exist.
    pub const EXCHANGE_NOT_FOUND: u16 = 4004;
}

/// Client-side reconciliation buffer for chat messages.
///
/// Because broadcasts include the sender's own session, a client that sends
/// a message will also receive it back. Inserting every incoming message
/// through [`MessageLog::insert`] keeps the log free of duplicates and in
/// creation order regardless of echo timing.
#[derive(Debug, Default)]
pub struct MessageLog {
    seen: HashSet<Uuid>,
    messages: Vec<MessageResponse>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, returning `false` if it was already known.
    pub fn insert(&mut self, message: MessageResponse) -> bool {
        if !self.seen.insert(message.message_id) {
            return false;
        }
        // Ordered by creation time, id as tie-break. Incoming broadcasts
        // are usually already in order, so this is a cheap append in the
        // common case.
        let key = (message.created_at, message.message_id);
        let pos = self
            .messages
            .partition_point(|m| (m.created_at, m.message_id) <= key);
        self.messages.insert(pos, message);
        true
    }

    /// Messages in creation order (oldest first).
    pub fn messages(&self) -> &[MessageResponse] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
