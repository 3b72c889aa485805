//! The rating gate.
//!
//! One rating per exchange, requester rates provider, only after
//! completion. Recomputes the rated user's running average from the full
//! rating history so the stored value never drifts.

use crate::entities::{ExchangeStatus, NotificationKind, Rating};
use crate::error::EngineError;
use crate::services::exchange::ExchangeEngine;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// Submit the requester's rating for a completed exchange.
#[derive(Debug, Clone)]
pub struct RateExchange {
    pub exchange_id: Uuid,
    pub actor_id: Uuid,
    pub rated_user_id: Uuid,
    pub score: u8,
    pub review_text: Option<String>,
}

impl Processor<RateExchange> for ExchangeEngine {
    type Output = Rating;
    type Error = EngineError;

    #[tracing::instrument(skip_all, err, name = "Engine:RateExchange")]
    async fn process(&self, msg: RateExchange) -> Result<Rating, EngineError> {
        // Serialize with status transitions so a rating cannot slip in
        // between the CAS to Completed and its settlement.
        let _guard = self.locks.acquire(msg.exchange_id).await;

        let exchange = self
            .store
            .find_exchange(msg.exchange_id)
            .await?
            .ok_or(EngineError::NotFound("exchange"))?;
        if exchange.requester_id != msg.actor_id {
            return Err(EngineError::Forbidden);
        }
        if msg.rated_user_id != exchange.provider_id {
            return Err(EngineError::InvalidTarget);
        }
        if exchange.status != ExchangeStatus::Completed {
            return Err(EngineError::InvalidState);
        }
        if !(1..=5).contains(&msg.score) {
            return Err(EngineError::InvalidScore);
        }
        if self
            .store
            .rating_for_exchange(msg.exchange_id)
            .await?
            .is_some()
        {
            return Err(EngineError::AlreadyRated);
        }

        let rating = Rating::new(
            msg.exchange_id,
            msg.actor_id,
            msg.rated_user_id,
            i16::from(msg.score),
            msg.review_text,
        );
        self.store.insert_rating(&rating).await?;

        // Mean over the complete history, not an incremental update.
        let all = self.store.ratings_of_user(msg.rated_user_id).await?;
        if !all.is_empty() {
            let sum: Decimal = all.iter().map(|r| Decimal::from(r.score)).sum();
            let average = sum / Decimal::from(all.len() as u32);
            self.store
                .set_average_rating(msg.rated_user_id, average)
                .await?;
        }

        let rater_name = self.display_name_of(msg.actor_id).await;
        self.notifier
            .notify(
                msg.rated_user_id,
                NotificationKind::NewRating,
                json!({
                    "exchange_id": msg.exchange_id,
                    "rater_name": rater_name.as_str(),
                    "score": rating.score,
                }),
            )
            .await;

        Ok(rating)
    }
}
