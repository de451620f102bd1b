pub mod error;
pub mod health;
pub mod joins;
pub mod routes;
pub mod ws;

pub use error::{not_found, ErrorResponse};

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::feed::FeedManager;

pub fn router(feed: Arc<FeedManager>) -> Router {
    let ws_state = ws::WsState { feed: feed.clone() };

    Router::new()
        .nest("/routes", routes::router(feed.clone()))
        .nest("/joins", joins::router(feed.clone()))
        .nest("/health", health::router(feed))
        .route("/ws/board", get(ws::ws_board).with_state(ws_state))
}
