use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use oskx_core::error::EngineError;
use oskx_core::services::ChangeExchangeStatus;
use oskx_sdk::objects::{ChangeStatusRequest, ExchangeStatus};
use uuid::Uuid;

use super::to_response;
use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// `PUT /{exchange_id}/status` — generic lifecycle transition.
///
/// The target status is carried as a string; unknown values are rejected
/// with `invalid_status` before touching the aggregate.
pub(super) async fn change_status(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Path(exchange_id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target: ExchangeStatus = payload
        .status
        .parse()
        .map_err(|_| ApiError(EngineError::InvalidStatus))?;

    let exchange = state
        .engine
        .process(ChangeExchangeStatus {
            exchange_id,
            actor_id,
            target: target.into(),
        })
        .await?;
    Ok(Json(to_response(&exchange)))
}
