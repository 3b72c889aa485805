//! Notification API handlers.
//!
//! # Endpoints
//!
//! - `GET    /`                      – list the actor's notifications (newest first)
//! - `GET    /unread-count`          – count unread notifications
//! - `PUT    /{notification_id}/read` – mark one notification as read
//! - `PUT    /read-all`              – mark every notification as read
//! - `DELETE /{notification_id}`     – delete one notification

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use kanau::processor::Processor;
use oskx_core::entities::Notification;
use oskx_core::services::{
    DeleteNotification, ListNotifications, MarkAllNotificationsRead, MarkNotificationRead,
    UnreadNotificationCount,
};
use oskx_sdk::objects::{NotificationResponse, UnreadCountResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiError;
use crate::api::extractors::Actor;
use crate::state::AppState;

/// Build the Notification API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/{notification_id}/read", put(mark_read))
        .route("/{notification_id}", delete(delete_notification))
}

/// Convert a `Notification` (DB model) into a `NotificationResponse`.
pub(crate) fn to_response(n: &Notification) -> NotificationResponse {
    NotificationResponse {
        notification_id: n.notification_id,
        kind: n.kind.into(),
        payload: n.payload.clone(),
        is_read: n.is_read,
        created_at: n.created_at.unix_timestamp(),
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<u64>,
}

/// `GET /` — list the actor's notifications, newest first.
async fn list_notifications(
    state: State<AppState>,
    Actor(user_id): Actor,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state
        .notifier
        .process(ListNotifications {
            user_id,
            limit: params.limit,
        })
        .await?;
    let responses: Vec<NotificationResponse> = notifications.iter().map(to_response).collect();
    Ok(Json(responses))
}

/// `GET /unread-count` — count unread notifications.
async fn unread_count(
    state: State<AppState>,
    Actor(user_id): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let count = state
        .notifier
        .process(UnreadNotificationCount { user_id })
        .await?;
    Ok(Json(UnreadCountResponse {
        unread_count: count,
    }))
}

/// `PUT /{notification_id}/read` — mark one notification as read.
///
/// Returns 404 for notifications owned by other users.
async fn mark_read(
    state: State<AppState>,
    Actor(user_id): Actor,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notifier
        .process(MarkNotificationRead {
            user_id,
            notification_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /read-all` — mark every notification of the actor as read.
async fn mark_all_read(
    state: State<AppState>,
    Actor(user_id): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .notifier
        .process(MarkAllNotificationsRead { user_id })
        .await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// `DELETE /{notification_id}` — delete one notification.
///
/// Same ownership scoping as mark-read.
async fn delete_notification(
    state: State<AppState>,
    Actor(user_id): Actor,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notifier
        .process(DeleteNotification {
            user_id,
            notification_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
