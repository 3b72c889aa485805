//! Custom Axum extractors for request authentication.
//!
//! The engine runs behind the platform gateway, which authenticates the
//! user and forwards their id in the `X-Actor-Id` header. The [`Actor`]
//! extractor reads and parses that header; it does not verify identity
//! itself.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// Header carrying the authenticated user's id.
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// The authenticated user on whose behalf the request acts.
pub struct Actor(pub Uuid);

/// Errors returned by the [`Actor`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("missing X-Actor-Id header")]
    MissingHeader,
    #[error("invalid X-Actor-Id header")]
    InvalidHeader,
}

impl IntoResponse for ActorError {
    fn into_response(self) -> Response {
        let status = match self {
            ActorError::MissingHeader => StatusCode::UNAUTHORIZED,
            ActorError::InvalidHeader => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ActorError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or(ActorError::MissingHeader)?
            .to_str()
            .map_err(|_| ActorError::InvalidHeader)?;
        let user_id = value.parse::<Uuid>().map_err(|_| ActorError::InvalidHeader)?;
        Ok(Actor(user_id))
    }
}
