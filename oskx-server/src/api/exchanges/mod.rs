//! Exchange API handlers.
//!
//! # Endpoints
//!
//! - `POST   /`               – open a new exchange (escrows the cost)
//! - `GET    /`               – list the actor's exchanges
//! - `GET    /{exchange_id}`  – exchange detail with messages and ratings
//! - `POST   /{exchange_id}/accept`   – provider accepts
//! - `POST   /{exchange_id}/decline`  – provider declines (refunds)
//! - `PUT    /{exchange_id}/status`   – generic lifecycle transition
//! - `POST   /{exchange_id}/messages` – send a chat message
//! - `POST   /{exchange_id}/rating`   – rate a completed exchange

use axum::{
    Router,
    routing::{get, post, put},
};
use oskx_core::entities::{Exchange, Message, Rating};
use oskx_sdk::objects::{ExchangeResponse, MessageResponse, RatingResponse};

use crate::state::AppState;

mod change_status;
mod create;
mod detail;
mod rate;
mod respond;
mod send_message;

/// Build the Exchange API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create::create_exchange).get(detail::list_exchanges))
        .route("/{exchange_id}", get(detail::get_exchange))
        .route("/{exchange_id}/accept", post(respond::accept_exchange))
        .route("/{exchange_id}/decline", post(respond::decline_exchange))
        .route("/{exchange_id}/status", put(change_status::change_status))
        .route(
            "/{exchange_id}/messages",
            post(send_message::send_message),
        )
        .route("/{exchange_id}/rating", post(rate::rate_exchange))
}

/// Convert an `Exchange` (DB model) into an `ExchangeResponse` (API model).
pub(crate) fn to_response(e: &Exchange) -> ExchangeResponse {
    ExchangeResponse {
        exchange_id: e.exchange_id,
        requester_id: e.requester_id,
        provider_id: e.provider_id,
        skill_id: e.skill_id,
        skill_label: e.skill_label.to_string(),
        skill_level: e.skill_level.as_ref().map(|s| s.to_string()),
        description: e.description.clone(),
        session_type: e.session_type.as_ref().map(|s| s.to_string()),
        hourly_rate: e.hourly_rate,
        duration_hours: e.duration_hours,
        total_cost: e.total_cost,
        scheduled_date: e.scheduled_date.map(|t| t.unix_timestamp()),
        is_mutual_exchange: e.is_mutual_exchange,
        status: e.status.into(),
        created_at: e.created_at.unix_timestamp(),
        updated_at: e.updated_at.unix_timestamp(),
    }
}

/// Convert a `Message` (DB model) into a `MessageResponse` (API model).
pub(crate) fn to_message_response(m: &Message) -> MessageResponse {
    MessageResponse {
        message_id: m.message_id,
        exchange_id: m.exchange_id,
        sender_id: m.sender_id,
        content: m.content.clone(),
        kind: m.kind.into(),
        created_at: m.created_at.unix_timestamp(),
    }
}

/// Convert a `Rating` (DB model) into a `RatingResponse` (API model).
pub(crate) fn to_rating_response(r: &Rating) -> RatingResponse {
    RatingResponse {
        rating_id: r.rating_id,
        exchange_id: r.exchange_id,
        rater_id: r.rater_id,
        rated_user_id: r.rated_user_id,
        score: r.score.clamp(0, u8::MAX as i16) as u8,
        review_text: r.review_text.clone(),
        created_at: r.created_at.unix_timestamp(),
    }
}
