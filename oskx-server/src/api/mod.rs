//! HTTP and WebSocket API handlers.
//!
//! All endpoints act on behalf of a user identified by the `X-Actor-Id`
//! header (see [`extractors::Actor`]); identity verification is owned by
//! the platform gateway in front of this service.

pub mod exchanges;
pub mod extractors;
pub mod notifications;
pub mod points;
pub mod ws;

use axum::{Json, http::StatusCode, response::IntoResponse};
use oskx_core::error::EngineError;
use oskx_sdk::objects::ErrorResponse;

/// Engine error wrapper implementing the HTTP mapping.
///
/// Every failing call returns an [`ErrorResponse`] JSON body whose `kind`
/// field is the engine's stable discriminant.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            EngineError::InvalidInput(_)
            | EngineError::SelfExchange
            | EngineError::InsufficientFunds { .. }
            | EngineError::InvalidStatus
            | EngineError::EmptyContent
            | EngineError::InvalidTarget
            | EngineError::InvalidScore => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Forbidden => StatusCode::FORBIDDEN,
            EngineError::InvalidTransition { .. }
            | EngineError::InvalidState
            | EngineError::AlreadyRated
            | EngineError::Conflict => StatusCode::CONFLICT,
            EngineError::Storage(e) => {
                tracing::error!(error = %e, "API storage error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            kind: self.0.kind().to_owned(),
            message: match &self.0 {
                // Do not leak internals.
                EngineError::Storage(_) => "internal server error".to_owned(),
                other => other.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oskx_core::store::StoreError;

    #[test]
    fn status_mapping() {
        let cases = [
            (EngineError::SelfExchange, StatusCode::BAD_REQUEST),
            (EngineError::NotFound("exchange"), StatusCode::NOT_FOUND),
            (EngineError::Forbidden, StatusCode::FORBIDDEN),
            (EngineError::AlreadyRated, StatusCode::CONFLICT),
            (EngineError::Conflict, StatusCode::CONFLICT),
            (
                EngineError::Storage(StoreError::Database(sqlx::Error::PoolClosed)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
