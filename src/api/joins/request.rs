use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::{not_found, ErrorResponse};
use crate::feed::JoinOutcome;

use super::JoinsState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// The route to join for today
    pub route_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub route_id: String,
    /// Whether the rider is joined (true once the commit has landed)
    pub joined: bool,
    /// Whether a join commit is still in flight
    pub loading: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinBoardResponse {
    /// Route ids joined for today, sorted
    pub joined: Vec<String>,
    /// Route ids with a commit in flight, sorted
    pub pending: Vec<String>,
}

/// Request to join a route for today
///
/// Safe to repeat: a second request while the first is committing, or for
/// an already-joined route, changes nothing.
#[utoipa::path(
    post,
    path = "/api/joins",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Join state for the route", body = JoinResponse),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "joins"
)]
pub async fn request_join(
    State(state): State<JoinsState>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (joined, loading) = match state.feed.request_join(&request.route_id).await {
        JoinOutcome::UnknownRoute => return Err(not_found("Route not found")),
        JoinOutcome::Pending | JoinOutcome::AlreadyPending => (false, true),
        JoinOutcome::AlreadyJoined => (true, false),
    };

    Ok(Json(JoinResponse {
        route_id: request.route_id,
        joined,
        loading,
    }))
}

/// List today's joins
#[utoipa::path(
    get,
    path = "/api/joins",
    responses(
        (status = 200, description = "Joined and pending routes", body = JoinBoardResponse)
    ),
    tag = "joins"
)]
pub async fn list_joins(State(state): State<JoinsState>) -> Json<JoinBoardResponse> {
    let (joined, pending) = state.feed.join_snapshot().await;
    Json(JoinBoardResponse { joined, pending })
}
