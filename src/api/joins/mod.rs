mod request;

pub use request::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::feed::FeedManager;

#[derive(Clone)]
pub struct JoinsState {
    pub feed: Arc<FeedManager>,
}

pub fn router(feed: Arc<FeedManager>) -> Router {
    let state = JoinsState { feed };
    Router::new()
        .route("/", post(request_join).get(list_joins))
        .with_state(state)
}
