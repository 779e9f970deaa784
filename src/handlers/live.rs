// src/handlers/live.rs

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::{live::ObserverRegistry, service::ScoreService};

/// Upgrades to a WebSocket that receives `new-score` and `clear-scores` events.
pub async fn live_updates(
    ws: WebSocketUpgrade,
    State(service): State<ScoreService>,
) -> impl IntoResponse {
    let observers = service.observers().clone();
    ws.on_upgrade(move |socket| observe(socket, observers))
}

async fn observe(socket: WebSocket, observers: Arc<ObserverRegistry>) {
    let (id, mut events) = observers.register();
    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if sender.send(Message::Text(event.into())).await.is_err() {
                break;
            }
        }
    });

    // Incoming frames are ignored; the loop only watches for the close.
    let mut watch = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => watch.abort(),
        _ = &mut watch => forward.abort(),
    }

    observers.unregister(id);
}
