use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::feed::{FeedManager, RouteCard};

#[derive(Clone)]
pub struct WsState {
    pub feed: Arc<FeedManager>,
}

/// Client subscription message
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ClientMessage {
    /// Subscribe to specific routes; an empty list subscribes to all
    Subscribe { route_ids: Vec<String> },
}

/// Server message sent to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ServerMessage {
    /// Initial connection acknowledgment
    Connected { message: String },
    /// Full board (sent on subscribe)
    Board { tick: u64, routes: Vec<RouteCard> },
    /// Incremental update with only the cards that changed
    BoardUpdate { tick: u64, changes: Vec<RouteCard> },
    /// Error message
    Error { message: String },
}

/// Compute a hash for a single card for change detection.
///
/// Name, description and departure are static; only the live fields can
/// change between updates.
fn compute_card_hash(card: &RouteCard) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    card.id.hash(&mut hasher);
    card.joined.hash(&mut hasher);
    card.loading.hash(&mut hasher);
    for stop in &card.stops {
        stop.id.hash(&mut hasher);
        stop.eta.hash(&mut hasher);
    }
    hasher.finish()
}

/// Previous state tracking for a connection
#[derive(Default)]
struct PreviousState {
    /// Map of route_id -> card hash
    card_hashes: HashMap<String, u64>,
}

/// Cards that are new or changed since the previous state
fn compute_changes(previous: &mut PreviousState, current: &[RouteCard]) -> Vec<RouteCard> {
    let mut changes = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for card in current {
        seen.insert(card.id.as_str());
        let new_hash = compute_card_hash(card);

        match previous.card_hashes.get(&card.id) {
            Some(&old_hash) if old_hash == new_hash => {
                // No change
            }
            _ => {
                changes.push(card.clone());
                previous.card_hashes.insert(card.id.clone(), new_hash);
            }
        }
    }

    // Drop hashes for cards outside the current subscription
    previous.card_hashes.retain(|id, _| seen.contains(id.as_str()));

    changes
}

/// WebSocket endpoint for live board updates
pub async fn ws_board(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates_rx = state.feed.updates_sender().subscribe();
    // None until the first subscribe; Some(empty) means all routes
    let mut subscribed_routes: Option<HashSet<String>> = None;
    let mut previous_state = PreviousState::default();

    // Send connected message
    let connected_msg = ServerMessage::Connected {
        message: "Connected to board updates. Send subscribe message with route_ids.".to_string(),
    };
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Channel to communicate subscriptions from receiver task to sender task
    let (sub_tx, mut sub_rx) = tokio::sync::mpsc::channel::<Vec<String>>(16);

    // Clone state for the forward task
    let forward_state = state.clone();

    // Spawn task to forward feed updates to the WebSocket
    let forward_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                // Handle subscription updates
                Some(route_ids) = sub_rx.recv() => {
                    let unknown: Vec<&String> = route_ids
                        .iter()
                        .filter(|id| !forward_state.feed.catalog().contains(id.as_str()))
                        .collect();
                    if !unknown.is_empty() {
                        let msg = ServerMessage::Error {
                            message: format!(
                                "Unknown route ids: {}",
                                unknown
                                    .iter()
                                    .map(|s| s.as_str())
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            ),
                        };
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        continue;
                    }

                    subscribed_routes = Some(route_ids.into_iter().collect());
                    // Reset previous state when the subscription changes
                    previous_state = PreviousState::default();

                    let (tick, routes) = build_selected_board(
                        &forward_state.feed,
                        subscribed_routes.as_ref(),
                    )
                    .await;

                    // Initialize previous state with the current board
                    for card in &routes {
                        previous_state
                            .card_hashes
                            .insert(card.id.clone(), compute_card_hash(card));
                    }

                    let msg = ServerMessage::Board { tick, routes };
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                // Handle feed updates
                result = updates_rx.recv() => {
                    match result {
                        Ok(update) => {
                            if subscribed_routes.is_none() {
                                continue;
                            }
                            let (_, routes) = build_selected_board(
                                &forward_state.feed,
                                subscribed_routes.as_ref(),
                            )
                            .await;
                            let changes = compute_changes(&mut previous_state, &routes);

                            // Only send if something actually changed
                            if !changes.is_empty() {
                                let msg = ServerMessage::BoardUpdate {
                                    tick: update.tick,
                                    changes,
                                };
                                if let Ok(json) = serde_json::to_string(&msg) {
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }
    });

    // Handle incoming messages from client
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    match client_msg {
                        ClientMessage::Subscribe { route_ids } => {
                            let _ = sub_tx.send(route_ids).await;
                        }
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

    // Cleanup
    forward_task.abort();
}

/// Board filtered to the subscribed routes; an empty selection means all.
async fn build_selected_board(
    feed: &Arc<FeedManager>,
    selection: Option<&HashSet<String>>,
) -> (u64, Vec<RouteCard>) {
    let (tick, mut routes) = feed.board().await;
    if let Some(selected) = selection {
        if !selected.is_empty() {
            routes.retain(|card| selected.contains(&card.id));
        }
    }
    (tick, routes)
}
