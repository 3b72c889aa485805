//! WebSocket relay endpoint.
//!
//! `GET /ws` upgrades the connection and subscribes the session to the
//! actor's personal topic. Exchange rooms are joined and left with
//! explicit client frames; joining is authorized against the exchange's
//! parties. Delivery is best-effort; the durable record stays in the
//! inbox and exchange detail endpoints.

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use oskx_core::events::{RelayEvent, RelaySender, Topic, relay_channel};
use oskx_sdk::objects::ws::{WsClientMessage, WsCloseCode, WsServerMessage};
use uuid::Uuid;

use crate::api::extractors::Actor;
use crate::api::{exchanges, notifications};
use crate::state::AppState;

/// `GET /ws` — real-time event stream for the acting user.
pub async fn user_ws(
    state: State<AppState>,
    Actor(user_id): Actor,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_session(socket, app_state, user_id))
}

/// Convert a relay event into its wire frame.
fn to_server_message(event: RelayEvent) -> WsServerMessage {
    match event {
        RelayEvent::MessageReceived { message } => WsServerMessage::MessageReceived {
            message: exchanges::to_message_response(&message),
        },
        RelayEvent::ExchangeStatusChanged {
            exchange_id,
            status,
            changed_by,
        } => WsServerMessage::ExchangeStatusChanged {
            exchange_id,
            status: status.into(),
            changed_by,
        },
        RelayEvent::NotificationCreated { notification } => WsServerMessage::NotificationCreated {
            notification: notifications::to_response(&notification),
        },
    }
}

/// Background task that drives a single WebSocket session.
///
/// The session id is distinct from the user id so one user can hold
/// several concurrent connections. The personal topic is joined before
/// the loop starts; any exchange rooms joined along the way are cleaned
/// up by the final `disconnect`.
async fn handle_session(mut socket: WebSocket, state: AppState, user_id: Uuid) {
    let session_id = Uuid::now_v7();
    let (sender, mut events) = relay_channel();

    state
        .relay
        .join(session_id, Topic::User(user_id), sender.clone())
        .await;
    tracing::debug!(%session_id, %user_id, "WS: session connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if send_json(&mut socket, &to_server_message(event)).await.is_err() {
                            break;
                        }
                    }
                    // Relay dropped our sender (pruned as dead).
                    None => break,
                }
            }

            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(
                            &mut socket,
                            &state,
                            session_id,
                            user_id,
                            &sender,
                            text.as_str(),
                        )
                        .await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.relay.disconnect(session_id).await;
    tracing::debug!(%session_id, %user_id, "WS: session disconnected");
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: WsCloseCode::NORMAL,
            reason: "bye".into(),
        })))
        .await;
}

/// Handle one client frame. Errors are reported as in-band `Error`
/// frames; none of them close the connection.
async fn handle_client_frame(
    socket: &mut WebSocket,
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
    sender: &RelaySender,
    text: &str,
) {
    let frame = match serde_json::from_str::<WsClientMessage>(text) {
        Ok(frame) => frame,
        Err(_) => {
            let _ = send_json(
                socket,
                &WsServerMessage::Error {
                    code: WsCloseCode::BAD_FRAME,
                    reason: "unparseable frame".to_owned(),
                },
            )
            .await;
            return;
        }
    };

    match frame {
        WsClientMessage::JoinExchange { exchange_id } => {
            let exchange = match state.store.find_exchange(exchange_id).await {
                Ok(Some(e)) => e,
                Ok(None) => {
                    let _ = send_json(
                        socket,
                        &WsServerMessage::Error {
                            code: WsCloseCode::EXCHANGE_NOT_FOUND,
                            reason: "exchange not found".to_owned(),
                        },
                    )
                    .await;
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, %exchange_id, "WS: join lookup failed");
                    let _ = send_json(
                        socket,
                        &WsServerMessage::Error {
                            code: WsCloseCode::INTERNAL_ERROR,
                            reason: "internal error".to_owned(),
                        },
                    )
                    .await;
                    return;
                }
            };
            if !exchange.is_party(user_id) {
                let _ = send_json(
                    socket,
                    &WsServerMessage::Error {
                        code: WsCloseCode::FORBIDDEN,
                        reason: "not a party to this exchange".to_owned(),
                    },
                )
                .await;
                return;
            }
            state
                .relay
                .join(session_id, Topic::Exchange(exchange_id), sender.clone())
                .await;
        }
        WsClientMessage::LeaveExchange { exchange_id } => {
            state
                .relay
                .leave(session_id, Topic::Exchange(exchange_id))
                .await;
        }
    }
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
