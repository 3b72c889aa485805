//! Application state shared across all request handlers.

use oskx_core::events::Relay;
use oskx_core::services::{ExchangeEngine, Ledger, Notifier};
use oskx_core::store::Store;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Storage backend, also used directly by the WebSocket join check.
    pub store: Arc<dyn Store>,
    /// The exchange state machine.
    pub engine: ExchangeEngine,
    /// The points ledger.
    pub ledger: Ledger,
    /// The notification inbox.
    pub notifier: Notifier,
    /// Pub/sub relay backing the WebSocket endpoint.
    pub relay: Relay,
}

impl AppState {
    /// Wire the full service stack on top of a storage backend.
    pub fn new(store: Arc<dyn Store>) -> Self {
        let relay = Relay::new();
        let ledger = Ledger::new(store.clone());
        let notifier = Notifier::new(store.clone(), relay.clone());
        let engine = ExchangeEngine::new(
            store.clone(),
            ledger.clone(),
            notifier.clone(),
            relay.clone(),
        );
        Self {
            store,
            engine,
            ledger,
            notifier,
            relay,
        }
    }
}
