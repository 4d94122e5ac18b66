//! Query engine over the cached snapshot
//!
//! `QueryEngine` decides when the snapshot is too old, refreshes it through a
//! [`Fetcher`], writes it back to the [`SnapshotStore`], and answers queue
//! position queries from memory. Queries never fail: when a refresh does not
//! work out, the engine answers from whatever snapshot it already holds.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::SnapshotStore;
use crate::data::{query_snapshot, QueryResult, Snapshot};
use crate::fetch::{FetchError, FetchOutcome, Fetcher};

/// Default age after which the snapshot is refreshed (5 minutes)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Default share of departments that must be read for a cycle to count
pub const DEFAULT_MIN_SUCCESS_RATIO: f64 = 0.5;

/// Source of the current time
pub trait Clock {
    /// Current time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// When to refresh, and when a refresh counts as done
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicy {
    /// Snapshots older than this are refreshed before answering
    pub max_age: Duration,
    /// Fraction of attempted departments that must succeed before
    /// `last_update` moves forward. `0.0` always moves it.
    pub min_success_ratio: f64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            min_success_ratio: DEFAULT_MIN_SUCCESS_RATIO,
        }
    }
}

impl RefreshPolicy {
    /// Whether a snapshot last updated at `last_update` is stale at `now`.
    ///
    /// A snapshot that was never updated is always stale. One stamped in the
    /// future (clock skew) is not.
    pub fn is_stale(&self, last_update: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_update {
            None => true,
            Some(at) => now
                .signed_duration_since(at)
                .to_std()
                .map(|age| age > self.max_age)
                .unwrap_or(false),
        }
    }

    /// Whether a cycle read enough departments to mark the snapshot fresh
    pub fn accepts(&self, outcome: &FetchOutcome) -> bool {
        let attempted = outcome.attempted();
        if attempted == 0 {
            return false;
        }
        outcome.tables.len() as f64 / attempted as f64 >= self.min_success_ratio
    }
}

/// What one refresh cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Departments whose tables were replaced
    pub refreshed: usize,
    /// Departments that kept their previous table
    pub failed: Vec<String>,
    /// Whether `last_update` moved forward
    pub marked_fresh: bool,
}

/// Caching query layer over the enrollment board
pub struct QueryEngine<F, C = SystemClock> {
    snapshot: Snapshot,
    /// `None` keeps the snapshot in memory only
    store: Option<SnapshotStore>,
    fetcher: F,
    clock: C,
    policy: RefreshPolicy,
}

impl<F: Fetcher, C: Clock> QueryEngine<F, C> {
    /// Creates an engine, loading the last snapshot from the store if any
    pub fn open(store: Option<SnapshotStore>, fetcher: F, clock: C, policy: RefreshPolicy) -> Self {
        let snapshot = store
            .as_ref()
            .map(SnapshotStore::load)
            .unwrap_or_default();
        Self {
            snapshot,
            store,
            fetcher,
            clock,
            policy,
        }
    }

    /// The snapshot currently held in memory
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Whether the next query will trigger a refresh
    pub fn is_stale(&self) -> bool {
        self.policy
            .is_stale(self.snapshot.last_update, self.clock.now())
    }

    /// Where `exam_number` stands in every department it appears in.
    ///
    /// Refreshes first when the snapshot is stale. A failed refresh is logged
    /// and the answer comes from the snapshot already held.
    pub async fn query_status(&mut self, exam_number: &str) -> Vec<QueryResult> {
        if self.is_stale() {
            info!("data is outdated, fetching new data");
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "refresh failed, answering from cached data");
            }
        }
        query_snapshot(&self.snapshot, exam_number)
    }

    /// Runs one full refresh cycle regardless of staleness.
    ///
    /// Departments read this cycle replace their tables; the rest keep their
    /// previous ones. The merged snapshot replaces the old one in a single
    /// step and is persisted. `last_update` only moves when the policy
    /// accepts the cycle. An `Err` leaves the snapshot untouched.
    pub async fn refresh(&mut self) -> Result<RefreshSummary, FetchError> {
        let outcome = self.fetcher.fetch_all().await?;
        let marked_fresh = self.policy.accepts(&outcome);

        if !outcome.failed.is_empty() {
            warn!(
                failed = outcome.failed.len(),
                attempted = outcome.attempted(),
                departments = ?outcome.failed,
                "some departments could not be read, keeping their previous tables"
            );
        }
        if !marked_fresh {
            warn!(
                min_success_ratio = self.policy.min_success_ratio,
                "too few departments read, data stays marked stale"
            );
        }

        let FetchOutcome { tables, failed } = outcome;
        let refreshed = tables.len();

        let mut departments = self.snapshot.departments.clone();
        departments.extend(tables);
        let last_update = if marked_fresh {
            Some(self.clock.now())
        } else {
            self.snapshot.last_update
        };
        self.snapshot = Snapshot {
            departments,
            last_update,
        };

        self.persist();
        info!(refreshed, failed = failed.len(), marked_fresh, "refresh cycle finished");

        Ok(RefreshSummary {
            refreshed,
            failed,
            marked_fresh,
        })
    }

    fn persist(&self) {
        if let Some(ref store) = self.store {
            if let Err(e) = store.save(&self.snapshot) {
                warn!(error = %e, "failed to persist snapshot");
            }
        }
    }
}
