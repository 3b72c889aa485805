use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use kanau::processor::Processor;
use oskx_core::services::RateExchange;
use oskx_sdk::objects::RateExchangeRequest;
use uuid::Uuid;

use super::to_rating_response;
use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// `POST /{exchange_id}/rating` — rate a completed exchange.
///
/// The requester rates the provider, once, after completion.
pub(super) async fn rate_exchange(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Path(exchange_id): Path<Uuid>,
    Json(payload): Json<RateExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = state
        .engine
        .process(RateExchange {
            exchange_id,
            actor_id,
            rated_user_id: payload.rated_user_id,
            score: payload.score,
            review_text: payload.review_text,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(to_rating_response(&rating))))
}
