use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::feed::FeedManager;

#[derive(Clone)]
pub struct HealthState {
    pub feed: Arc<FeedManager>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Number of routes in the catalog
    pub route_count: usize,
    /// Total number of stops across all routes
    pub stop_count: usize,
    /// Current feed tick
    pub current_tick: u64,
    /// Whether the tick driver is running
    pub feed_running: bool,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        route_count: state.feed.catalog().len(),
        stop_count: state.feed.catalog().stop_count(),
        current_tick: state.feed.current_tick(),
        feed_running: state.feed.is_running(),
    })
}

pub fn router(feed: Arc<FeedManager>) -> Router {
    let state = HealthState { feed };
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}
