//! Read-only snapshots of the tracking service's entities.
//!
//! Field names follow the service's JSON (snake_case). Nothing here is ever
//! mutated after a load; a reload replaces the whole collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub objective: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Killed,
    /// Anything the service sends that this client does not know about.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// The five statuses the service defines, in display order.
    pub const KNOWN: [RunStatus; 5] = [
        RunStatus::Queued,
        RunStatus::Running,
        RunStatus::Finished,
        RunStatus::Failed,
        RunStatus::Killed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Finished => "finished",
            RunStatus::Failed => "failed",
            RunStatus::Killed => "killed",
            RunStatus::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Queued => "Queued",
            RunStatus::Running => "Running",
            RunStatus::Finished => "Finished",
            RunStatus::Failed => "Failed",
            RunStatus::Killed => "Killed",
            RunStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment_id: String,
    #[serde(default)]
    pub run_name: Option<String>,
    pub status: RunStatus,
    /// Kept as the service's ISO-8601 text; ordering compares the text.
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

impl Run {
    /// Sort key for recency ordering: a missing timestamp sorts as "".
    pub fn start_key(&self) -> &str {
        self.started_at.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub metric_id: String,
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: String,
    pub name: String,
    pub task_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Metric-evaluation partition used by leaderboard queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Train,
    #[default]
    Val,
    Test,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Train, Scope::Val, Scope::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Train => "train",
            Scope::Val => "val",
            Scope::Test => "test",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Scope::Train),
            "val" => Ok(Scope::Val),
            "test" => Ok(Scope::Test),
            other => Err(format!("unknown scope '{}' (expected train, val or test)", other)),
        }
    }
}

/// Aggregate returned by `/reports/projects/{id}/dashboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDashboard {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub experiments_count: Option<i64>,
    #[serde(default)]
    pub runs_count: Option<i64>,
    #[serde(default)]
    pub success_rate_pct: Option<f64>,
    #[serde(default)]
    pub median_train_seconds: Option<f64>,
    #[serde(default)]
    pub best_metric_value: Option<f64>,
    #[serde(default)]
    pub best_run_id: Option<String>,
}

/// One row of `/reports/experiments/{id}/leaderboard`, already ordered by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub run_id: String,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default)]
    pub metric_value: Option<f64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: RunStatus,
}

fn unknown_status() -> RunStatus {
    RunStatus::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_status_unknown_value_does_not_fail() {
        let run: Run = serde_json::from_value(json!({
            "run_id": "r1",
            "experiment_id": "e1",
            "status": "paused",
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert_eq!(run.start_key(), "");
    }

    #[test]
    fn test_run_ignores_extra_fields() {
        let run: Run = serde_json::from_value(json!({
            "run_id": "r1",
            "experiment_id": "e1",
            "dataset_version_id": "dv1",
            "run_name": null,
            "status": "finished",
            "started_at": "2024-01-01T10:00:00Z",
            "git_commit": "abc",
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.start_key(), "2024-01-01T10:00:00Z");
        assert!(run.run_name.is_none());
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("val".parse::<Scope>().unwrap(), Scope::Val);
        assert_eq!(" TEST ".parse::<Scope>().unwrap(), Scope::Test);
        assert!("holdout".parse::<Scope>().is_err());
        assert_eq!(Scope::default(), Scope::Val);
    }

    #[test]
    fn test_dashboard_tolerates_missing_fields() {
        let d: ProjectDashboard = serde_json::from_value(json!({
            "project_id": "p1",
            "runs_count": 4,
        }))
        .unwrap();
        assert_eq!(d.runs_count, Some(4));
        assert!(d.success_rate_pct.is_none());
    }
}
