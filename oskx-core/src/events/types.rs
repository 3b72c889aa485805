//! Event types for the real-time relay.
//!
//! Relay events are ephemeral accelerations of durable state: a client
//! that misses one reconciles against the inbox and the exchange detail
//! after reconnect. Events carry the persisted entity (with its durable
//! id) so consumers can deduplicate against already-known data.

use crate::entities::{ExchangeStatus, Message, Notification};
use uuid::Uuid;

/// A subscription topic.
///
/// Every connected session is subscribed to its user's personal topic;
/// exchange topics are joined explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    User(Uuid),
    Exchange(Uuid),
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Exchange(id) => write!(f, "exchange:{id}"),
        }
    }
}

/// An event pushed to connected sessions.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A chat message was persisted. Broadcast to the exchange topic,
    /// sender included, so the sender reconciles against the durable copy.
    MessageReceived { message: Message },

    /// An exchange changed status. Broadcast to the exchange topic.
    ExchangeStatusChanged {
        exchange_id: Uuid,
        status: ExchangeStatus,
        changed_by: Uuid,
    },

    /// A notification was appended to a user's inbox. Published to the
    /// personal topic.
    NotificationCreated { notification: Notification },
}
