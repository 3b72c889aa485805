use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use oskx_core::services::{AcceptExchange, DeclineExchange};
use uuid::Uuid;

use super::to_response;
use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// `POST /{exchange_id}/accept` — provider accepts a pending exchange.
pub(super) async fn accept_exchange(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Path(exchange_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let exchange = state
        .engine
        .process(AcceptExchange {
            exchange_id,
            actor_id,
        })
        .await?;
    Ok(Json(to_response(&exchange)))
}

/// `POST /{exchange_id}/decline` — provider declines a pending exchange.
///
/// The escrowed points are refunded to the requester.
pub(super) async fn decline_exchange(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Path(exchange_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let exchange = state
        .engine
        .process(DeclineExchange {
            exchange_id,
            actor_id,
        })
        .await?;
    Ok(Json(to_response(&exchange)))
}
