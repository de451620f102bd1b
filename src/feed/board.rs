//! Per-route view models for the rendering surface.
//!
//! Consumers receive fully-computed cards; they never see the tick counter
//! or the ledger directly.

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{Catalog, Route};

use super::eta::compute_etas;
use super::types::JoinLedger;

/// One route as presented to the UI.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RouteCard {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Scheduled departure formatted for display, e.g. "8:00 AM"
    pub departs: String,
    /// Stops in visiting order, each with its current simulated ETA
    pub stops: Vec<StopEta>,
    /// Whether the rider has joined this route for today
    pub joined: bool,
    /// Whether a join request is still committing
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StopEta {
    pub id: String,
    pub name: String,
    /// Simulated arrival time, e.g. "8:09 AM"
    pub eta: String,
}

pub fn build_card(
    route: &Route,
    tick: u64,
    ledger: &JoinLedger,
    service_date: NaiveDate,
) -> RouteCard {
    let etas = compute_etas(route.departure, route.stops.len(), tick, service_date);
    let stops = route
        .stops
        .iter()
        .zip(etas)
        .map(|(stop, eta)| StopEta {
            id: stop.id.clone(),
            name: stop.name.clone(),
            eta,
        })
        .collect();

    RouteCard {
        id: route.id.clone(),
        name: route.name.clone(),
        description: route.description.clone(),
        departs: route.departure.display(),
        stops,
        joined: ledger.is_joined(&route.id),
        loading: ledger.is_pending(&route.id),
    }
}

pub fn build_board(
    catalog: &Catalog,
    tick: u64,
    ledger: &JoinLedger,
    service_date: NaiveDate,
) -> Vec<RouteCard> {
    catalog
        .routes()
        .iter()
        .map(|route| build_card(route, tick, ledger, service_date))
        .collect()
}
