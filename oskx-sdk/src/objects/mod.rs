pub mod exchange;
pub mod notification;
pub mod points;
pub mod ws;

pub use exchange::{
    ChangeStatusRequest, CreateExchangeRequest, ExchangeDetailResponse, ExchangeResponse,
    ExchangeStatus, MessageKind, MessageResponse, RateExchangeRequest, RatingResponse,
    SendMessageRequest,
};
pub use notification::{NotificationKind, NotificationResponse, UnreadCountResponse};
pub use points::{BalanceResponse, TransactionKind, TransactionPage, TransactionResponse};

use serde::{Deserialize, Serialize};

/// Error envelope returned by every failing API call.
///
/// `kind` is a stable machine-readable discriminant; `message` is for humans
/// and may change between releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}
