//! Simulated live shuttle feed.
//!
//! This module handles:
//! - The tick driver pacing ETA recomputation
//! - The join ledger and its delayed commit transitions
//! - Publishing feed updates to live consumers

mod board;
mod eta;
mod types;

pub use board::{build_board, build_card, RouteCard, StopEta};
pub use eta::compute_etas;
pub use types::{
    FeedUpdate, FeedUpdateSender, JoinLedger, JoinOutcome, JoinStore, UpdateCause,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::FeedConfig;

/// Owns the tick counter, the join ledger and the update channel.
///
/// All state is in-memory and resets on restart: joins last for the
/// process lifetime and the tick counter restarts at 0.
pub struct FeedManager {
    catalog: Catalog,
    tick: AtomicU64,
    joins: JoinStore,
    updates_tx: FeedUpdateSender,
    tick_interval: Duration,
    join_delay: Duration,
    timezone: Tz,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl FeedManager {
    pub fn new(catalog: Catalog, config: &FeedConfig) -> Result<Self, FeedError> {
        if config.tick_interval_ms == 0 {
            return Err(FeedError::InvalidTickInterval);
        }
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|_| FeedError::InvalidTimezone(config.timezone.clone()))?;

        // Capacity 16 - consumers rebuild the full board anyway
        let (updates_tx, _) = broadcast::channel(16);

        Ok(Self {
            catalog,
            tick: AtomicU64::new(0),
            joins: Arc::new(RwLock::new(JoinLedger::default())),
            updates_tx,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            join_delay: Duration::from_millis(config.join_delay_ms),
            timezone,
            driver: Mutex::new(None),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the update sender for passing to live consumers
    pub fn updates_sender(&self) -> FeedUpdateSender {
        self.updates_tx.clone()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Today's date in the configured timezone. ETA rollover anchors here.
    pub fn service_date(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Human-readable service day, e.g. "Tuesday, Aug 5, 2026".
    pub fn service_day(&self) -> String {
        self.service_date().format("%A, %b %-d, %Y").to_string()
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Start the tick driver.
    ///
    /// The driver holds only a weak reference back to the manager, so
    /// dropping the manager ends the loop even without an explicit
    /// `shutdown` call.
    pub fn start(self: &Arc<Self>) {
        let mut driver = match self.driver.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if driver.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("Feed driver already running");
            return;
        }

        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "Starting feed driver"
        );

        let weak = Arc::downgrade(self);
        let interval = self.tick_interval;
        *driver = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            // The first fire is immediate; consume it so the board stays
            // at tick 0 for one full interval after startup.
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(manager) = weak.upgrade() else { break };
                let tick = manager.tick.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(tick, "Feed tick");
                let _ = manager
                    .updates_tx
                    .send(FeedUpdate::now(tick, UpdateCause::Tick));
            }
        }));
    }

    /// Stop the tick driver. The counter keeps its value; no further
    /// ticks are published.
    pub fn shutdown(&self) {
        if let Ok(mut driver) = self.driver.lock() {
            if let Some(handle) = driver.take() {
                handle.abort();
                info!("Feed driver stopped");
            }
        }
    }

    /// Request to join a route for today.
    ///
    /// Marks the route pending and schedules a single delayed commit.
    /// Repeat requests while pending are ignored rather than rescheduled,
    /// and a request for a joined or unknown route changes nothing.
    pub async fn request_join(self: &Arc<Self>, route_id: &str) -> JoinOutcome {
        if !self.catalog.contains(route_id) {
            debug!(route_id = %route_id, "Join requested for unknown route, ignoring");
            return JoinOutcome::UnknownRoute;
        }

        {
            let mut ledger = self.joins.write().await;
            if ledger.is_joined(route_id) {
                debug!(route_id = %route_id, "Route already joined");
                return JoinOutcome::AlreadyJoined;
            }
            if ledger.is_pending(route_id) {
                debug!(route_id = %route_id, "Join already pending");
                return JoinOutcome::AlreadyPending;
            }
            ledger.pending.insert(route_id.to_string());
        }

        info!(
            route_id = %route_id,
            delay_ms = self.join_delay.as_millis() as u64,
            "Join requested"
        );

        let weak = Arc::downgrade(self);
        let delay = self.join_delay;
        let route_id = route_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // The feed may have been torn down mid-delay; discard the
            // pending transition instead of touching freed state.
            let Some(manager) = weak.upgrade() else {
                debug!(route_id = %route_id, "Feed gone, discarding pending join");
                return;
            };

            {
                let mut ledger = manager.joins.write().await;
                if ledger.pending.remove(&route_id) {
                    ledger.joined.insert(route_id.clone());
                }
            }
            info!(route_id = %route_id, "Join committed");
            let _ = manager
                .updates_tx
                .send(FeedUpdate::now(manager.current_tick(), UpdateCause::Join));
        });

        JoinOutcome::Pending
    }

    /// Consistent (tick, cards) pair for one derivation pass.
    pub async fn board(&self) -> (u64, Vec<RouteCard>) {
        let tick = self.current_tick();
        let today = self.service_date();
        let ledger = self.joins.read().await;
        (tick, build_board(&self.catalog, tick, &ledger, today))
    }

    pub async fn card(&self, route_id: &str) -> Option<RouteCard> {
        let route = self.catalog.route(route_id)?;
        let tick = self.current_tick();
        let today = self.service_date();
        let ledger = self.joins.read().await;
        Some(build_card(route, tick, &ledger, today))
    }

    /// Sorted (joined, pending) id lists.
    pub async fn join_snapshot(&self) -> (Vec<String>, Vec<String>) {
        let ledger = self.joins.read().await;
        let mut joined: Vec<String> = ledger.joined.iter().cloned().collect();
        let mut pending: Vec<String> = ledger.pending.iter().cloned().collect();
        joined.sort();
        pending.sort();
        (joined, pending)
    }
}

impl Drop for FeedManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("Tick interval must be greater than zero")]
    InvalidTickInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_routes;
    use tokio::time::{advance, sleep};

    const TICK_MS: u64 = 4500;
    const DELAY_MS: u64 = 600;

    fn manager() -> Arc<FeedManager> {
        let catalog = Catalog::from_configs(&default_routes()).unwrap();
        let config = FeedConfig {
            tick_interval_ms: TICK_MS,
            join_delay_ms: DELAY_MS,
            timezone: "UTC".to_string(),
        };
        Arc::new(FeedManager::new(catalog, &config).unwrap())
    }

    /// Let spawned tasks run their ready work on the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn rejects_zero_interval() {
        let catalog = Catalog::from_configs(&default_routes()).unwrap();
        let config = FeedConfig {
            tick_interval_ms: 0,
            join_delay_ms: DELAY_MS,
            timezone: "UTC".to_string(),
        };
        assert!(matches!(
            FeedManager::new(catalog, &config),
            Err(FeedError::InvalidTickInterval)
        ));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let catalog = Catalog::from_configs(&default_routes()).unwrap();
        let config = FeedConfig {
            tick_interval_ms: TICK_MS,
            join_delay_ms: DELAY_MS,
            timezone: "Mars/Olympus_Mons".to_string(),
        };
        assert!(matches!(
            FeedManager::new(catalog, &config),
            Err(FeedError::InvalidTimezone(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_advances_once_per_interval() {
        let feed = manager();
        feed.start();
        settle().await;
        assert_eq!(feed.current_tick(), 0);

        for expected in 1..=3 {
            advance(Duration::from_millis(TICK_MS)).await;
            settle().await;
            assert_eq!(feed.current_tick(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_published_on_the_channel() {
        let feed = manager();
        let mut rx = feed.updates_sender().subscribe();
        feed.start();
        settle().await;

        advance(Duration::from_millis(TICK_MS)).await;
        settle().await;

        let update = rx.try_recv().unwrap();
        assert_eq!(update.tick, 1);
        assert_eq!(update.cause, UpdateCause::Tick);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_further_ticks() {
        let feed = manager();
        feed.start();
        settle().await;
        assert!(feed.is_running());

        advance(Duration::from_millis(TICK_MS)).await;
        settle().await;
        assert_eq!(feed.current_tick(), 1);

        feed.shutdown();
        settle().await;
        assert!(!feed.is_running());

        advance(Duration::from_millis(TICK_MS * 3)).await;
        settle().await;
        assert_eq!(feed.current_tick(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_a_single_driver() {
        let feed = manager();
        feed.start();
        feed.start();
        settle().await;

        advance(Duration::from_millis(TICK_MS)).await;
        settle().await;
        assert_eq!(feed.current_tick(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn join_passes_through_loading_then_commits() {
        let feed = manager();

        let outcome = feed.request_join("1a").await;
        assert_eq!(outcome, JoinOutcome::Pending);

        {
            let guard = feed.joins.read().await;
            assert!(guard.is_pending("1a"));
            assert!(!guard.is_joined("1a"));
        }

        sleep(Duration::from_millis(DELAY_MS + 50)).await;
        settle().await;

        let guard = feed.joins.read().await;
        assert!(!guard.is_pending("1a"));
        assert!(guard.is_joined("1a"));
    }

    #[tokio::test(start_paused = true)]
    async fn join_commit_notifies_consumers() {
        let feed = manager();
        let mut rx = feed.updates_sender().subscribe();

        feed.request_join("2b").await;
        sleep(Duration::from_millis(DELAY_MS + 50)).await;
        settle().await;

        let update = rx.try_recv().unwrap();
        assert_eq!(update.cause, UpdateCause::Join);
    }

    #[tokio::test(start_paused = true)]
    async fn join_is_idempotent_while_pending() {
        let feed = manager();

        assert_eq!(feed.request_join("1a").await, JoinOutcome::Pending);
        assert_eq!(feed.request_join("1a").await, JoinOutcome::AlreadyPending);

        sleep(Duration::from_millis(DELAY_MS + 50)).await;
        settle().await;

        assert_eq!(feed.request_join("1a").await, JoinOutcome::AlreadyJoined);
        let (joined, pending) = feed.join_snapshot().await;
        assert_eq!(joined, vec!["1a".to_string()]);
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_route_changes_nothing() {
        let feed = manager();
        assert_eq!(feed.request_join("9z").await, JoinOutcome::UnknownRoute);

        let (joined, pending) = feed.join_snapshot().await;
        assert!(joined.is_empty());
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_commit_is_discarded_when_feed_is_dropped() {
        let feed = manager();
        let store = feed.joins.clone();

        feed.request_join("1a").await;
        feed.shutdown();
        drop(feed);

        sleep(Duration::from_millis(DELAY_MS + 50)).await;
        settle().await;

        // The commit task found no manager to upgrade; the route never
        // became joined.
        let guard = store.read().await;
        assert!(!guard.is_joined("1a"));
    }

    #[tokio::test(start_paused = true)]
    async fn board_reflects_joins_and_tick() {
        let feed = manager();
        let (tick, cards) = feed.board().await;
        assert_eq!(tick, 0);
        assert_eq!(cards.len(), 3);
        assert!(!cards[0].joined);

        feed.request_join("1a").await;
        let (_, cards) = feed.board().await;
        assert!(cards[0].loading);

        sleep(Duration::from_millis(DELAY_MS + 50)).await;
        settle().await;
        let (_, cards) = feed.board().await;
        assert!(cards[0].joined);
        assert!(!cards[0].loading);
    }

    #[tokio::test(start_paused = true)]
    async fn card_lookup_matches_board() {
        let feed = manager();
        let card = feed.card("2b").await.unwrap();
        assert_eq!(card.name, "Central Express");
        assert_eq!(card.stops.len(), 1);
        assert!(feed.card("9z").await.is_none());
    }
}
