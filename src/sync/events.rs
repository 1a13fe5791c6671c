//! Inputs to and outputs from the reducer.

use serde::Serialize;

use super::epoch::Epoch;
use super::loader::Collections;
use super::reports::{DashboardKey, LeaderboardKey, ReportTicket};
use crate::client::TransportError;
use crate::model::{LeaderboardRow, ProjectDashboard, Scope};
use crate::session::Credential;

/// Which screen is showing; reports only run for the screen that shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Overview,
    Leaderboard,
    Runs,
    Imports,
}

impl View {
    pub const ALL: [View; 4] = [View::Overview, View::Leaderboard, View::Runs, View::Imports];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::Leaderboard => "leaderboard",
            View::Runs => "runs",
            View::Imports => "imports",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        View::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

#[derive(Debug)]
pub enum Event {
    // === Triggers from the user ===
    SignedIn(Credential),
    SignedOut,
    Refresh,
    SelectProject(String),
    SelectExperiment(String),
    FilterRunsByExperiment(String),
    SelectMetric(String),
    SetScope(Scope),
    SetLimit(u32),
    Show(View),

    // === Completions of issued commands ===
    CollectionsLoaded {
        epoch: Epoch,
        result: Result<Collections, TransportError>,
    },
    DashboardLoaded {
        ticket: ReportTicket<DashboardKey>,
        result: Result<ProjectDashboard, TransportError>,
    },
    LeaderboardLoaded {
        ticket: ReportTicket<LeaderboardKey>,
        result: Result<Vec<LeaderboardRow>, TransportError>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SignedIn(_) => "signed_in",
            Event::SignedOut => "signed_out",
            Event::Refresh => "refresh",
            Event::SelectProject(_) => "select_project",
            Event::SelectExperiment(_) => "select_experiment",
            Event::FilterRunsByExperiment(_) => "filter_runs",
            Event::SelectMetric(_) => "select_metric",
            Event::SetScope(_) => "set_scope",
            Event::SetLimit(_) => "set_limit",
            Event::Show(_) => "show",
            Event::CollectionsLoaded { .. } => "collections_loaded",
            Event::DashboardLoaded { .. } => "dashboard_loaded",
            Event::LeaderboardLoaded { .. } => "leaderboard_loaded",
        }
    }
}

/// Network work the reducer asks for. Each carries what its completion needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadCollections {
        epoch: Epoch,
        credential: Credential,
    },
    FetchDashboard {
        ticket: ReportTicket<DashboardKey>,
        credential: Credential,
    },
    FetchLeaderboard {
        ticket: ReportTicket<LeaderboardKey>,
        credential: Credential,
    },
}
