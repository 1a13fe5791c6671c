//! Report Fetcher: selection-keyed queries with stale-response discard.
//!
//! Each query owns a `ReportSlot` with its own epoch. Requesting a new key
//! supersedes whatever is in flight; a response commits only if its epoch is
//! still current and its key is still the requested one.

use serde::Serialize;
use url::form_urlencoded;

use super::epoch::{Epoch, EpochCounter};
use super::selection::Selection;
use crate::model::Scope;

/// Percent-encode one path segment. Form encoding writes a space as `+`,
/// which a path reads literally, so it is rewritten to `%20`.
fn path_segment(id: &str) -> String {
    form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Key of the project dashboard aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DashboardKey {
    pub project_id: String,
}

impl DashboardKey {
    pub fn from_selection(sel: &Selection) -> Option<Self> {
        if sel.project_id.is_empty() {
            return None;
        }
        Some(Self {
            project_id: sel.project_id.clone(),
        })
    }

    pub fn path(&self) -> String {
        format!("/reports/projects/{}/dashboard", path_segment(&self.project_id))
    }
}

/// Key of the experiment leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LeaderboardKey {
    pub experiment_id: String,
    pub metric_key: String,
    pub scope: Scope,
    pub limit: u32,
}

impl LeaderboardKey {
    pub fn from_selection(sel: &Selection) -> Option<Self> {
        if sel.experiment_id.is_empty() || sel.metric_key.is_empty() || sel.limit == 0 {
            return None;
        }
        Some(Self {
            experiment_id: sel.experiment_id.clone(),
            metric_key: sel.metric_key.clone(),
            scope: sel.scope,
            limit: sel.limit,
        })
    }

    pub fn path(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("metric_key", &self.metric_key)
            .append_pair("scope", self.scope.as_str())
            .append_pair("limit", &self.limit.to_string())
            .finish();
        format!(
            "/reports/experiments/{}/leaderboard?{}",
            path_segment(&self.experiment_id),
            query
        )
    }
}

/// Handle for one issued request; comes back with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTicket<K> {
    pub epoch: Epoch,
    pub key: K,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Committed,
    Failed(String),
    Stale,
}

impl ReportOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReportOutcome::Committed => "committed",
            ReportOutcome::Failed(_) => "failed",
            ReportOutcome::Stale => "stale",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ReportOutcome::Failed(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ReportSlot<K, V> {
    epoch: EpochCounter,
    requested: Option<K>,
    in_flight: Option<ReportTicket<K>>,
    committed: Option<(K, V)>,
}

impl<K, V> Default for ReportSlot<K, V> {
    fn default() -> Self {
        Self {
            epoch: EpochCounter::new(),
            requested: None,
            in_flight: None,
            committed: None,
        }
    }
}

impl<K: Clone + PartialEq, V> ReportSlot<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the slot at `key`. Returns a ticket when a fetch must be issued.
    ///
    /// Re-requesting the current key is a no-op; `None` supersedes any
    /// in-flight request without issuing a new one.
    pub fn request(&mut self, key: Option<K>) -> Option<ReportTicket<K>> {
        if key == self.requested {
            return None;
        }
        let epoch = self.epoch.advance();
        self.requested = key.clone();
        self.in_flight = key.map(|key| ReportTicket { epoch, key });
        self.in_flight.clone()
    }

    /// Forget the requested key so the next `request` refetches it.
    pub fn invalidate(&mut self) {
        self.epoch.advance();
        self.requested = None;
        self.in_flight = None;
    }

    /// Invalidate and drop the committed value.
    pub fn reset(&mut self) {
        self.invalidate();
        self.committed = None;
    }

    pub fn complete(&mut self, ticket: ReportTicket<K>, result: Result<V, String>) -> ReportOutcome {
        if !self.epoch.is_current(ticket.epoch) || self.requested.as_ref() != Some(&ticket.key) {
            return ReportOutcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(value) => {
                self.committed = Some((ticket.key, value));
                ReportOutcome::Committed
            }
            Err(message) => ReportOutcome::Failed(message),
        }
    }

    /// Committed value for the currently requested key.
    pub fn current(&self) -> Option<&V> {
        match (&self.committed, &self.requested) {
            (Some((key, value)), Some(requested)) if key == requested => Some(value),
            _ => None,
        }
    }

    /// Last committed value and its key, whatever is requested now.
    pub fn latest(&self) -> Option<(&K, &V)> {
        self.committed.as_ref().map(|(k, v)| (k, v))
    }

    pub fn requested(&self) -> Option<&K> {
        self.requested.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }
}
