use uuid::Uuid;

/// A one-time, directional satisfaction score for a completed exchange.
///
/// At most one rating exists per exchange; the requester rates the
/// provider.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Rating {
    pub rating_id: Uuid,
    pub exchange_id: Uuid,
    pub rater_id: Uuid,
    pub rated_user_id: Uuid,
    /// Integer 1..=5 (stored as i16 for the database).
    pub score: i16,
    pub review_text: Option<String>,
    pub created_at: time::OffsetDateTime,
}

impl Rating {
    pub fn new(
        exchange_id: Uuid,
        rater_id: Uuid,
        rated_user_id: Uuid,
        score: i16,
        review_text: Option<String>,
    ) -> Self {
        Self {
            rating_id: Uuid::now_v7(),
            exchange_id,
            rater_id,
            rated_user_id,
            score,
            review_text,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }
}
