mod list;

pub use list::*;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::feed::FeedManager;

#[derive(Clone)]
pub struct RoutesState {
    pub feed: Arc<FeedManager>,
}

pub fn router(feed: Arc<FeedManager>) -> Router {
    let state = RoutesState { feed };
    Router::new()
        .route("/", get(list_routes))
        .route("/{id}", get(get_route))
        .with_state(state)
}
