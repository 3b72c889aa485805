use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use compact_str::CompactString;
use kanau::processor::Processor;
use oskx_core::entities::ExchangeTerms;
use oskx_core::error::EngineError;
use oskx_core::services::CreateExchange;
use oskx_sdk::objects::CreateExchangeRequest;
use time::OffsetDateTime;

use super::to_response;
use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// `POST /` — open a new exchange.
///
/// The acting user becomes the requester and the total cost is escrowed
/// from their balance immediately.
pub(super) async fn create_exchange(
    state: State<AppState>,
    Actor(actor_id): Actor,
    Json(payload): Json<CreateExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let scheduled_date = payload
        .scheduled_date
        .map(OffsetDateTime::from_unix_timestamp)
        .transpose()
        .map_err(|_| {
            ApiError(EngineError::InvalidInput(
                "scheduled_date is not a valid unix timestamp".to_owned(),
            ))
        })?;

    let exchange = state
        .engine
        .process(CreateExchange {
            requester_id: actor_id,
            provider_id: payload.provider_id,
            terms: ExchangeTerms {
                skill_id: payload.skill_id,
                skill_label: CompactString::from(payload.skill_label),
                skill_level: payload.skill_level.map(CompactString::from),
                description: payload.description,
                session_type: payload.session_type.map(CompactString::from),
                hourly_rate: payload.hourly_rate,
                duration_hours: payload.duration_hours,
                scheduled_date,
                is_mutual_exchange: payload.is_mutual_exchange,
            },
        })
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(&exchange))))
}
