//! Transport-independent publish/subscribe relay.
//!
//! The relay tracks which session listens to which [`Topic`] and fans
//! events out with a non-blocking `try_send` per member, so a slow or
//! dead consumer can never stall the publisher. Delivery is best-effort
//! only; durable state lives in the store.

use super::types::{RelayEvent, Topic};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Buffer size for per-session event channels.
///
/// Enough to absorb bursts; a session that falls further behind loses
/// events and must reconcile after reconnect.
pub const RELAY_CHANNEL_BUFFER: usize = 256;

/// Sender half of a session's event channel.
pub type RelaySender = mpsc::Sender<RelayEvent>;
/// Receiver half of a session's event channel.
pub type RelayReceiver = mpsc::Receiver<RelayEvent>;

/// Create a new per-session event channel.
pub fn relay_channel() -> (RelaySender, RelayReceiver) {
    mpsc::channel(RELAY_CHANNEL_BUFFER)
}

#[derive(Default)]
struct RelayInner {
    /// Topic -> session id -> sender.
    topics: HashMap<Topic, HashMap<Uuid, RelaySender>>,
    /// Session id -> topics it is subscribed to, for disconnect cleanup.
    sessions: HashMap<Uuid, HashSet<Topic>>,
}

/// Shared handle to the relay. Cheap to clone.
#[derive(Default, Clone)]
pub struct Relay {
    inner: Arc<RwLock<RelayInner>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a session to a topic.
    pub async fn join(&self, session_id: Uuid, topic: Topic, sender: RelaySender) {
        let mut inner = self.inner.write().await;
        inner
            .topics
            .entry(topic)
            .or_default()
            .insert(session_id, sender);
        inner.sessions.entry(session_id).or_default().insert(topic);
        tracing::debug!(%session_id, %topic, "relay join");
    }

    /// Unsubscribe a session from a single topic.
    pub async fn leave(&self, session_id: Uuid, topic: Topic) {
        let mut inner = self.inner.write().await;
        if let Some(members) = inner.topics.get_mut(&topic) {
            members.remove(&session_id);
            if members.is_empty() {
                inner.topics.remove(&topic);
            }
        }
        if let Some(topics) = inner.sessions.get_mut(&session_id) {
            topics.remove(&topic);
        }
        tracing::debug!(%session_id, %topic, "relay leave");
    }

    /// Remove a session from every topic it joined.
    pub async fn disconnect(&self, session_id: Uuid) {
        let mut inner = self.inner.write().await;
        let Some(topics) = inner.sessions.remove(&session_id) else {
            return;
        };
        for topic in topics {
            if let Some(members) = inner.topics.get_mut(&topic) {
                members.remove(&session_id);
                if members.is_empty() {
                    inner.topics.remove(&topic);
                }
            }
        }
        tracing::debug!(%session_id, "relay disconnect");
    }

    /// Fan an event out to every member of a topic.
    ///
    /// Fire-and-forget per member: a full buffer drops the event for that
    /// session, a closed channel schedules the session for cleanup.
    /// Returns the number of sessions the event was handed to.
    pub async fn publish(&self, topic: Topic, event: RelayEvent) -> usize {
        let mut delivered = 0;
        let mut dead: Vec<Uuid> = Vec::new();
        {
            let inner = self.inner.read().await;
            let Some(members) = inner.topics.get(&topic) else {
                return 0;
            };
            for (session_id, sender) in members {
                match sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(%session_id, %topic, "relay receiver lagging, event dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(*session_id);
                    }
                }
            }
        }
        for session_id in dead {
            self.disconnect(session_id).await;
        }
        delivered
    }

    /// Number of sessions currently subscribed to a topic.
    pub async fn member_count(&self, topic: Topic) -> usize {
        let inner = self.inner.read().await;
        inner.topics.get(&topic).map_or(0, HashMap::len)
    }
}
