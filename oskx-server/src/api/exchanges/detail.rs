use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use oskx_core::services::{GetExchangeDetail, ListExchangesFor};
use oskx_sdk::objects::{ExchangeDetailResponse, ExchangeResponse};
use uuid::Uuid;

use super::{to_message_response, to_rating_response, to_response};
use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// `GET /{exchange_id}` — exchange detail with conversation and ratings.
///
/// Only a party to the exchange may read it.
pub(super) async fn get_exchange(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Path(exchange_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .engine
        .process(GetExchangeDetail {
            exchange_id,
            actor_id,
        })
        .await?;
    Ok(Json(ExchangeDetailResponse {
        exchange: to_response(&detail.exchange),
        messages: detail.messages.iter().map(to_message_response).collect(),
        ratings: detail.ratings.iter().map(to_rating_response).collect(),
    }))
}

/// `GET /` — every exchange the actor is a party to, newest first.
pub(super) async fn list_exchanges(
    state: State<AppState>,
    Actor(actor_id): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let exchanges = state
        .engine
        .process(ListExchangesFor { actor_id })
        .await?;
    let responses: Vec<ExchangeResponse> = exchanges.iter().map(to_response).collect();
    Ok(Json(responses))
}
