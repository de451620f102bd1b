use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::{not_found, ErrorResponse};
use crate::feed::RouteCard;

use super::RoutesState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteListResponse {
    /// Human-readable service day, e.g. "Tuesday, Aug 5, 2026"
    pub service_day: String,
    /// Feed tick the ETAs were derived from
    pub tick: u64,
    pub routes: Vec<RouteCard>,
}

/// List all routes with their current ETAs and join state
#[utoipa::path(
    get,
    path = "/api/routes",
    responses(
        (status = 200, description = "All routes for today", body = RouteListResponse)
    ),
    tag = "routes"
)]
pub async fn list_routes(State(state): State<RoutesState>) -> Json<RouteListResponse> {
    let (tick, routes) = state.feed.board().await;
    Json(RouteListResponse {
        service_day: state.feed.service_day(),
        tick,
        routes,
    })
}

/// Get a single route with its current ETAs and join state
#[utoipa::path(
    get,
    path = "/api/routes/{id}",
    params(
        ("id" = String, Path, description = "Route identifier")
    ),
    responses(
        (status = 200, description = "The requested route", body = RouteCard),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route(
    State(state): State<RoutesState>,
    Path(id): Path<String>,
) -> Result<Json<RouteCard>, (StatusCode, Json<ErrorResponse>)> {
    state
        .feed
        .card(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found("Route not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::{default_routes, FeedConfig};
    use crate::feed::FeedManager;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> axum::Router {
        let catalog = Catalog::from_configs(&default_routes()).unwrap();
        let feed = Arc::new(FeedManager::new(catalog, &FeedConfig::default()).unwrap());
        super::super::router(feed)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_returns_all_route_cards() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["tick"], 0);
        assert!(json["service_day"].is_string());
        let routes = json["routes"].as_array().unwrap();
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0]["id"], "1a");
        assert_eq!(routes[0]["departs"], "8:00 AM");
        assert_eq!(routes[0]["stops"].as_array().unwrap().len(), 3);
        assert_eq!(routes[0]["joined"], false);
        assert_eq!(routes[0]["loading"], false);
    }

    #[tokio::test]
    async fn get_returns_a_single_card() {
        let response = test_router()
            .oneshot(Request::builder().uri("/2b").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["name"], "Central Express");
        assert_eq!(json["stops"].as_array().unwrap().len(), 1);
        assert_eq!(json["stops"][0]["id"], "hq");
        assert!(json["stops"][0]["eta"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_a_404() {
        let response = test_router()
            .oneshot(Request::builder().uri("/9z").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Route not found");
    }
}
