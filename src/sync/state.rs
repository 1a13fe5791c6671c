//! Everything the dashboard core owns. Mutated only by the reducer.

use std::sync::Arc;

use super::events::View;
use super::loader::{CollectionLoader, Collections};
use super::reports::{DashboardKey, LeaderboardKey, ReportSlot};
use super::selection::Selection;
use super::views::{DerivedViews, ViewCache};
use crate::config::Config;
use crate::model::{LeaderboardRow, ProjectDashboard, Scope};
use crate::session::Credential;

#[derive(Debug)]
pub struct DashboardState {
    pub(crate) credential: Option<Credential>,
    /// Bumped on every manual refresh.
    pub(crate) refresh_token: u64,
    pub(crate) loader: CollectionLoader,
    pub(crate) selection: Selection,
    pub(crate) view: View,
    pub(crate) dashboard: ReportSlot<DashboardKey, ProjectDashboard>,
    pub(crate) leaderboard: ReportSlot<LeaderboardKey, Vec<LeaderboardRow>>,
    /// Single view-level error; cleared when a new batch starts.
    pub(crate) error: Option<String>,
    pub(crate) views: ViewCache,
    /// Events applied so far.
    pub(crate) seq: u64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(Scope::Val, 10)
    }
}

impl DashboardState {
    pub fn new(scope: Scope, limit: u32) -> Self {
        Self {
            credential: None,
            refresh_token: 0,
            loader: CollectionLoader::new(),
            selection: Selection::new(scope, limit),
            view: View::default(),
            dashboard: ReportSlot::new(),
            leaderboard: ReportSlot::new(),
            error: None,
            views: ViewCache::default(),
            seq: 0,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.default_scope, cfg.default_limit)
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn refresh_token(&self) -> u64 {
        self.refresh_token
    }

    pub fn collections(&self) -> &Arc<Collections> {
        self.loader.collections()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn views(&self) -> &Arc<DerivedViews> {
        self.views.views()
    }

    pub fn dashboard(&self) -> &ReportSlot<DashboardKey, ProjectDashboard> {
        &self.dashboard
    }

    pub fn leaderboard(&self) -> &ReportSlot<LeaderboardKey, Vec<LeaderboardRow>> {
        &self.leaderboard
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// True while any current (non-superseded) request is outstanding.
    pub fn has_in_flight(&self) -> bool {
        self.loader.is_loading() || self.dashboard.is_loading() || self.leaderboard.is_loading()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}
