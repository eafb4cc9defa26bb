//! Progress channel: a duplex WebSocket per client. Clients send
//! `subscribe-job-progress`/`unsubscribe-job-progress`; the server
//! relays `job-created`/`job-progress`/`job-completed`/`job-failed`/
//! `job-cancelled` for every job the client is subscribed to (spec §6
//! "Progress channel", §4.8).
//!
//! Grounded on the teacher's axum-native `WebSocketUpgrade`/
//! `ws.on_upgrade(...)` handler in `api/rest_api.rs`, which this
//! supersedes the teacher's separate `tokio-tungstenite` pool with —
//! axum's own upgrade already covers everything this needs.

use super::AppState;
use crate::pubsub::{JobEvent, SubscriberId};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws/progress", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum ClientMessage {
    #[serde(rename = "subscribe-job-progress")]
    Subscribe { #[serde(rename = "jobId")] job_id: String },
    #[serde(rename = "unsubscribe-job-progress")]
    Unsubscribe { #[serde(rename = "jobId")] job_id: String },
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscriptions: HashMap<String, SubscriberId> = HashMap::new();
    let mut receivers = Vec::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { job_id }) => {
                                let (id, rx) = state.bus.subscribe(&job_id, 64);
                                subscriptions.insert(job_id, id);
                                receivers.push(rx);
                            }
                            Ok(ClientMessage::Unsubscribe { job_id }) => {
                                if let Some(id) = subscriptions.remove(&job_id) {
                                    state.bus.unsubscribe(&job_id, id);
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "ignoring malformed progress-channel message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "progress channel read error");
                        break;
                    }
                }
            }
            event = next_event(&mut receivers), if !receivers.is_empty() => {
                if let Some(event) = event {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    for (job_id, id) in subscriptions {
        state.bus.unsubscribe(&job_id, id);
    }
}

/// Waits on every live receiver and returns the next event. A receiver
/// whose channel has closed (unsubscribed or the bus dropped its sender)
/// is removed from `receivers` instead of being polled again, so a
/// closed channel can't spin the select loop.
async fn next_event(receivers: &mut Vec<tokio::sync::mpsc::Receiver<JobEvent>>) -> Option<JobEvent> {
    loop {
        if receivers.is_empty() {
            return None;
        }
        let futures: Vec<_> = receivers.iter_mut().map(|rx| Box::pin(rx.recv())).collect();
        let (event, index, _) = futures::future::select_all(futures).await;
        match event {
            Some(event) => return Some(event),
            None => {
                receivers.remove(index);
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &JobEvent) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(payload.into())).await
}
