use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::models::{PositionReport, PositionUpdate};
use crate::services::booking::SeatBookedEvent;
use crate::services::{PositionHub, SeatBookedSender};

#[derive(Clone)]
pub struct WsState {
    pub hub: Arc<PositionHub>,
    pub seat_booked_tx: SeatBookedSender,
}

/// Client message
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ClientMessage {
    /// Subscribe to position updates for specific schedules
    Subscribe { schedule_ids: Vec<i64> },
    /// Push one GPS sample (driver-device connection)
    Report {
        schedule_id: i64,
        lat: f64,
        lng: f64,
        speed_kmh: Option<f64>,
        timestamp: Option<chrono::DateTime<chrono::Utc>>,
    },
}

/// Server message sent to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ServerMessage {
    /// Initial connection acknowledgment
    Connected { message: String },
    /// Position update (latest snapshot on subscribe, then live)
    Position { update: PositionUpdate },
    /// A seat was booked on a subscribed schedule
    SeatBooked { event: SeatBookedEvent },
}

/// WebSocket endpoint for live position updates and driver reports
pub async fn ws_positions(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();
    let mut seat_rx = state.seat_booked_tx.subscribe();
    let mut subscribed: HashSet<i64> = HashSet::new();

    // Send connected message
    let connected_msg = ServerMessage::Connected {
        message: "Connected to live positions. Send subscribe message with schedule_ids."
            .to_string(),
    };
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Channel to communicate subscriptions from receiver task to sender task
    let (sub_tx, mut sub_rx) = mpsc::channel::<Vec<i64>>(16);
    // Per-schedule forwarders funnel broadcast updates into one channel
    let (agg_tx, mut agg_rx) = mpsc::channel::<PositionUpdate>(32);

    let forward_hub = state.hub.clone();
    let forward_task = tokio::spawn(async move {
        let mut forwarders: Vec<tokio::task::JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                // Handle subscription updates
                Some(schedule_ids) = sub_rx.recv() => {
                    for handle in forwarders.drain(..) {
                        handle.abort();
                    }
                    subscribed = schedule_ids.into_iter().collect();

                    for &schedule_id in &subscribed {
                        let (snapshot, rx) = forward_hub.subscribe(schedule_id).await;

                        // A late subscriber sees only the most recent position
                        if let Some(update) = snapshot {
                            let msg = ServerMessage::Position { update };
                            if let Ok(json) = serde_json::to_string(&msg) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    return;
                                }
                            }
                        }

                        forwarders.push(spawn_forwarder(rx, agg_tx.clone()));
                    }
                }
                // Live position updates from subscribed schedules
                Some(update) = agg_rx.recv() => {
                    let msg = ServerMessage::Position { update };
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                // Seat-booked events, filtered by subscription
                result = seat_rx.recv() => {
                    match result {
                        Ok(event) => {
                            if !subscribed.contains(&event.schedule_id) {
                                continue;
                            }
                            let msg = ServerMessage::SeatBooked { event };
                            if let Ok(json) = serde_json::to_string(&msg) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        for handle in forwarders {
            handle.abort();
        }
    });

    // Handle incoming messages from client
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Subscribe { schedule_ids }) => {
                        let _ = sub_tx.send(schedule_ids).await;
                    }
                    Ok(ClientMessage::Report {
                        schedule_id,
                        lat,
                        lng,
                        speed_kmh,
                        timestamp,
                    }) => {
                        // Validation failures are dropped inside the hub and
                        // not surfaced to the reporting device
                        let report = PositionReport {
                            schedule_id,
                            lat,
                            lng,
                            speed_kmh,
                            timestamp,
                        };
                        if let Err(e) = state.hub.report(report).await {
                            tracing::warn!(schedule_id, error = %e, "position report failed");
                        }
                    }
                    Err(_) => {
                        tracing::debug!("ignoring unparseable client message");
                    }
                }
            }
            Ok(Message::Ping(_)) => {
                // Axum handles pong automatically
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // Cleanup: dropping the aggregation channel stops the forwarders
    forward_task.abort();
}

/// Forward one schedule's broadcast stream into the connection's funnel.
/// A lagged receiver skips ahead; only the latest state matters.
fn spawn_forwarder(
    mut rx: broadcast::Receiver<PositionUpdate>,
    agg_tx: mpsc::Sender<PositionUpdate>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => {
                    if agg_tx.send(update).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
