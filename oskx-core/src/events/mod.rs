pub mod relay;
pub mod types;

pub use relay::{RELAY_CHANNEL_BUFFER, Relay, RelayReceiver, RelaySender, relay_channel};
pub use types::{RelayEvent, Topic};
