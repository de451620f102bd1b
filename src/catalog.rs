//! Static route catalog.
//!
//! Routes and stops are fixed definitions loaded at startup; they never
//! change at runtime. ETAs are not part of the catalog, they are derived
//! per tick by the feed.

use std::collections::HashSet;

use chrono::NaiveTime;

use crate::config::RouteConfig;

/// A scheduled base departure time (hour and minute, no seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartureTime(NaiveTime);

impl DepartureTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, CatalogError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or(CatalogError::DepartureOutOfRange { hour, minute })
    }

    /// Parse a 24-hour "HH:MM" string.
    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| CatalogError::InvalidDeparture(s.to_string()))?;
        let hour = h
            .trim()
            .parse()
            .map_err(|_| CatalogError::InvalidDeparture(s.to_string()))?;
        let minute = m
            .trim()
            .parse()
            .map_err(|_| CatalogError::InvalidDeparture(s.to_string()))?;
        Self::new(hour, minute)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Display form with no leading zero on the hour, e.g. "8:00 AM".
    pub fn display(&self) -> String {
        self.0.format("%-I:%M %p").to_string()
    }
}

/// A named point along a route. The id is unique within its route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub id: String,
    pub name: String,
}

/// A shuttle route: ordered stops plus a base departure time.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub description: String,
    pub departure: DepartureTime,
    pub stops: Vec<Stop>,
}

/// All routes the service knows about, in display order.
#[derive(Debug, Clone)]
pub struct Catalog {
    routes: Vec<Route>,
}

impl Catalog {
    /// Build and validate a catalog from the config definitions.
    pub fn from_configs(configs: &[RouteConfig]) -> Result<Self, CatalogError> {
        let mut seen_routes = HashSet::new();
        let mut routes = Vec::with_capacity(configs.len());

        for config in configs {
            if !seen_routes.insert(config.id.clone()) {
                return Err(CatalogError::DuplicateRoute(config.id.clone()));
            }

            let mut seen_stops = HashSet::new();
            let mut stops = Vec::with_capacity(config.stops.len());
            for stop in &config.stops {
                if !seen_stops.insert(stop.id.clone()) {
                    return Err(CatalogError::DuplicateStop {
                        route: config.id.clone(),
                        stop: stop.id.clone(),
                    });
                }
                stops.push(Stop {
                    id: stop.id.clone(),
                    name: stop.name.clone(),
                });
            }

            routes.push(Route {
                id: config.id.clone(),
                name: config.name.clone(),
                description: config.description.clone(),
                departure: DepartureTime::parse(&config.departure)?,
                stops,
            });
        }

        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.route(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Total number of stops across all routes.
    pub fn stop_count(&self) -> usize {
        self.routes.iter().map(|r| r.stops.len()).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid departure time '{0}': expected HH:MM")]
    InvalidDeparture(String),
    #[error("Departure time out of range: {hour}:{minute:02}")]
    DepartureOutOfRange { hour: u32, minute: u32 },
    #[error("Duplicate route id: {0}")]
    DuplicateRoute(String),
    #[error("Duplicate stop id '{stop}' on route {route}")]
    DuplicateStop { route: String, stop: String },
}
