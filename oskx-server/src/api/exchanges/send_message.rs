use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use kanau::processor::Processor;
use oskx_core::services::SendExchangeMessage;
use oskx_sdk::objects::SendMessageRequest;
use uuid::Uuid;

use super::to_message_response;
use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// `POST /{exchange_id}/messages` — send a chat message.
///
/// The durable copy is returned and simultaneously broadcast to the
/// exchange room, sender included.
pub(super) async fn send_message(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Path(exchange_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .engine
        .process(SendExchangeMessage {
            exchange_id,
            actor_id,
            content: payload.content,
            kind: payload.kind.into(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(to_message_response(&message))))
}
