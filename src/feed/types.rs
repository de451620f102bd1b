//! Type definitions for the feed module.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Membership ledger for route joins.
///
/// `pending` and `joined` are disjoint: an id moves from `pending` to
/// `joined` inside a single write-lock critical section and never leaves
/// `joined` afterwards.
#[derive(Debug, Default)]
pub struct JoinLedger {
    pub joined: HashSet<String>,
    pub pending: HashSet<String>,
}

impl JoinLedger {
    pub fn is_joined(&self, route_id: &str) -> bool {
        self.joined.contains(route_id)
    }

    pub fn is_pending(&self, route_id: &str) -> bool {
        self.pending.contains(route_id)
    }
}

/// Shared handle to the join ledger.
pub type JoinStore = Arc<RwLock<JoinLedger>>;

/// Result of a join request. Every variant leaves the ledger in a valid
/// state; none of them is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The request was accepted and a delayed commit is now pending.
    Pending,
    /// The route was joined earlier; nothing changed.
    AlreadyJoined,
    /// A commit for this route is already in flight; nothing changed.
    AlreadyPending,
    /// The id does not match any catalog route; nothing changed.
    UnknownRoute,
}

/// What caused a feed update to be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateCause {
    /// The interval driver advanced the tick counter
    Tick,
    /// A pending join committed
    Join,
}

/// Update notification published on the feed channel.
#[derive(Debug, Clone, Serialize)]
pub struct FeedUpdate {
    /// Tick counter value at the time of the update
    pub tick: u64,
    /// Timestamp when this update was generated
    pub timestamp: String,
    pub cause: UpdateCause,
}

impl FeedUpdate {
    pub fn now(tick: u64, cause: UpdateCause) -> Self {
        Self {
            tick,
            timestamp: chrono::Utc::now().to_rfc3339(),
            cause,
        }
    }
}

/// Sender for feed update notifications.
pub type FeedUpdateSender = broadcast::Sender<FeedUpdate>;
