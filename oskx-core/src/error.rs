//! Engine error taxonomy.
//!
//! Every engine operation returns [`EngineError`]. Validation errors are
//! raised before the first write, so a failed operation never leaves
//! partial state behind (the one documented exception is a storage failure
//! between escrow resolution steps, which is compensated, see
//! `services::exchange`).

use crate::store::StoreError;
use oskx_sdk::objects::ExchangeStatus;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed input, caught before any mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist. The payload names the entity
    /// class for the human-readable message only.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A user tried to open an exchange with themselves.
    #[error("cannot create an exchange with yourself")]
    SelfExchange,

    /// The requester's balance cannot cover the escrow.
    #[error("insufficient points: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// The actor is not authorized for this aggregate or action.
    #[error("not authorized for this action")]
    Forbidden,

    /// The target status string does not name a known status.
    #[error("unknown exchange status")]
    InvalidStatus,

    /// The requested transition is not in the allowed table.
    #[error("illegal transition from {from} to {to}")]
    InvalidTransition {
        from: ExchangeStatus,
        to: ExchangeStatus,
    },

    /// A chat message with no content.
    #[error("message content must not be empty")]
    EmptyContent,

    /// Rating attempted on an exchange that already has one.
    #[error("this exchange has already been rated")]
    AlreadyRated,

    /// Rating target is not the provider of the exchange.
    #[error("only the provider of the exchange can be rated")]
    InvalidTarget,

    /// Rating attempted before the exchange completed.
    #[error("only completed exchanges can be rated")]
    InvalidState,

    /// Rating score outside 1..=5.
    #[error("score must be an integer between 1 and 5")]
    InvalidScore,

    /// A concurrent mutation won the race; the caller may retry.
    #[error("concurrent update lost the race")]
    Conflict,

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// Stable machine-readable discriminant for transport adapters.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::NotFound(_) => "not_found",
            EngineError::SelfExchange => "self_exchange",
            EngineError::InsufficientFunds { .. } => "insufficient_funds",
            EngineError::Forbidden => "forbidden",
            EngineError::InvalidStatus => "invalid_status",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::EmptyContent => "empty_content",
            EngineError::AlreadyRated => "already_rated",
            EngineError::InvalidTarget => "invalid_target",
            EngineError::InvalidState => "invalid_state",
            EngineError::InvalidScore => "invalid_score",
            EngineError::Conflict => "conflict",
            EngineError::Storage(_) => "internal",
        }
    }
}
