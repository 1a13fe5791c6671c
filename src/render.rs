//! Plain-text presentation of the dashboard state for the CLI.
//!
//! Read-only: every function here takes `&DashboardState` and never mutates it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::model::{LeaderboardRow, RunStatus};
use crate::sync::DashboardState;

pub const RUN_LIST_LIMIT: usize = 20;
pub const DATASET_PREVIEW_LIMIT: usize = 5;

const MISSING: &str = "-";

pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => MISSING.to_string(),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => MISSING.to_string(),
    }
}

/// `42s` below a minute, `3m 5s` above. Zero reads as missing.
pub fn format_duration(seconds: Option<f64>) -> String {
    let s = match seconds {
        Some(s) if s != 0.0 && s.is_finite() => s,
        _ => return MISSING.to_string(),
    };
    if s < 60.0 {
        return format!("{:.0}s", s);
    }
    let minutes = (s / 60.0).floor() as u64;
    let remaining = (s % 60.0).floor() as u64;
    format!("{}m {}s", minutes, remaining)
}

/// Calendar date of an ISO-8601 timestamp, or `-` if it cannot be read.
pub fn format_date(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return MISSING.to_string();
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.date().format("%Y-%m-%d").to_string();
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => d.format("%Y-%m-%d").to_string(),
        Err(_) => MISSING.to_string(),
    }
}

/// `first6...last4`; short ids overlap rather than pad.
pub fn short_id(value: Option<&str>) -> String {
    let Some(id) = value.filter(|v| !v.is_empty()) else {
        return MISSING.to_string();
    };
    let chars: Vec<char> = id.chars().collect();
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}...{}", head, tail)
}

fn header(state: &DashboardState, title: &str) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", title)];
    if let Some(err) = state.error() {
        lines.push(format!("error: {}", err));
    }
    if state.is_loading() {
        lines.push("loading...".to_string());
    }
    lines
}

fn project_name(state: &DashboardState) -> String {
    let id = &state.selection().project_id;
    state
        .collections()
        .projects
        .iter()
        .find(|p| &p.project_id == id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn render_overview(state: &DashboardState) -> String {
    let mut lines = header(state, "Overview");
    let collections = state.collections();
    let views = state.views();
    let dash = state.dashboard().current().cloned().unwrap_or_default();
    let count = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| MISSING.to_string());

    lines.push(format!("project            {}", project_name(state)));
    lines.push(format!("experiments        {}", count(dash.experiments_count)));
    lines.push(format!("runs               {}", count(dash.runs_count)));
    lines.push(format!("success rate       {}", format_percent(dash.success_rate_pct)));
    lines.push(format!("median train time  {}", format_duration(dash.median_train_seconds)));
    lines.push(format!("best metric        {}", format_number(dash.best_metric_value)));
    lines.push(format!("best run           {}", short_id(dash.best_run_id.as_deref())));

    lines.push(String::new());
    lines.push("Run health".to_string());
    let histogram: Vec<String> = RunStatus::KNOWN
        .iter()
        .map(|s| format!("{} {}", s.label(), views.status_counts.get(*s)))
        .collect();
    lines.push(format!("  {}", histogram.join("  ")));

    lines.push("Recent runs".to_string());
    if views.recent_runs.is_empty() {
        lines.push("  No runs yet".to_string());
    }
    for run in &views.recent_runs {
        lines.push(format!(
            "  {:<24} {:<15} {}",
            run.run_name.as_deref().unwrap_or("Untitled"),
            short_id(Some(&run.run_id)),
            run.status.label()
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Datasets {}  Projects {}  Experiments {}  Metric defs {}",
        collections.datasets.len(),
        collections.projects.len(),
        collections.experiments.len(),
        collections.metrics.len()
    ));
    for dataset in collections.datasets.iter().take(DATASET_PREVIEW_LIMIT) {
        lines.push(format!(
            "  {:<24} {:<16} {}",
            dataset.name,
            dataset.task_type,
            short_id(Some(&dataset.dataset_id))
        ));
    }
    lines.join("\n")
}

fn or_missing(value: &str) -> &str {
    if value.is_empty() {
        MISSING
    } else {
        value
    }
}

fn leaderboard_line(row: &LeaderboardRow) -> String {
    let id = short_id(Some(&row.run_id));
    format!(
        "{:<24} {:<15} {:>12} {:<10} {}",
        row.run_name.clone().unwrap_or_else(|| id.clone()),
        id,
        format_number(row.metric_value),
        format_date(row.started_at.as_deref()),
        row.status.label()
    )
}

pub fn render_leaderboard(state: &DashboardState) -> String {
    let mut lines = header(state, "Leaderboard");
    let sel = state.selection();
    lines.push(format!(
        "experiment {}  metric {}  scope {}  limit {}",
        or_missing(&sel.experiment_id),
        or_missing(&sel.metric_key),
        sel.scope,
        sel.limit
    ));
    lines.push(format!("{:<24} {:<15} {:>12} {:<10} {}", "Run", "", "Metric", "Started", "Status"));
    match state.leaderboard().current() {
        Some(rows) if !rows.is_empty() => lines.extend(rows.iter().map(leaderboard_line)),
        _ => lines.push("No leaderboard data".to_string()),
    }
    lines.join("\n")
}

pub fn render_runs(state: &DashboardState) -> String {
    let mut lines = header(state, "Runs");
    let views = state.views();
    lines.push(format!("project {}", project_name(state)));
    lines.push(format!("{:<24} {:<15} {:<28} {:<10} {}", "Run", "", "Experiment", "Started", "Status"));
    if views.sorted_runs.is_empty() {
        lines.push("No runs yet".to_string());
    }
    for run in views.sorted_runs.iter().take(RUN_LIST_LIMIT) {
        let experiment = views
            .experiment_lookup
            .get(&run.experiment_id)
            .map(|e| e.name.as_str())
            .unwrap_or("Unknown experiment");
        lines.push(format!(
            "{:<24} {:<15} {:<28} {:<10} {}",
            run.run_name.as_deref().unwrap_or("Untitled"),
            short_id(Some(&run.run_id)),
            experiment,
            format_date(run.started_at.as_deref()),
            run.status.label()
        ));
    }
    lines.join("\n")
}

pub fn render_imports(state: &DashboardState) -> String {
    let mut lines = header(state, "Imports");
    lines.push("Batch import: send metrics or datasets in CSV/JSON.".to_string());
    lines.push(format!("  {:<10} {:<24} {}", "Endpoint", "/api/batch-import", "POST"));
    lines.push(format!("  {:<10} {:<24} {}", "Job types", "metrics, datasets", "csv/json"));
    lines.push(format!("  {:<10} {:<24} {}", "Auth", "Bearer token required", "RBAC"));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Experiment, Project, Run};
    use crate::session::Credential;
    use crate::sync::{reduce, Collections, Event};
    use crate::sync::epoch::Epoch;

    #[test]
    fn test_number_and_percent() {
        assert_eq!(format_number(Some(0.91234567)), "0.9123");
        assert_eq!(format_number(None), "-");
        assert_eq!(format_percent(Some(66.66)), "66.7%");
        assert_eq!(format_percent(None), "-");
    }

    #[test]
    fn test_duration() {
        assert_eq!(format_duration(Some(42.0)), "42s");
        assert_eq!(format_duration(Some(185.9)), "3m 5s");
        assert_eq!(format_duration(Some(0.0)), "-");
        assert_eq!(format_duration(None), "-");
        assert_eq!(format_duration(Some(f64::NAN)), "-");
    }

    #[test]
    fn test_date() {
        assert_eq!(format_date(Some("2024-03-05T10:00:00Z")), "2024-03-05");
        assert_eq!(format_date(Some("2024-03-05T10:00:00.123456")), "2024-03-05");
        assert_eq!(format_date(Some("2024-03-05")), "2024-03-05");
        assert_eq!(format_date(Some("yesterday")), "-");
        assert_eq!(format_date(None), "-");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id(Some("0123456789abcdef")), "012345...cdef");
        assert_eq!(short_id(Some("abc")), "abc...abc");
        assert_eq!(short_id(Some("")), "-");
        assert_eq!(short_id(None), "-");
    }

    fn loaded_state() -> DashboardState {
        let mut state = DashboardState::default();
        reduce(&mut state, Event::Show(crate::sync::View::Runs));
        let commands = reduce(&mut state, Event::SignedIn(Credential::bearer("u", "t")));
        let epoch = match &commands[0] {
            crate::sync::Command::LoadCollections { epoch, .. } => *epoch,
            other => panic!("unexpected {:?}", other),
        };
        reduce(&mut state, Event::CollectionsLoaded { epoch, result: Ok(fixture()) });
        state
    }

    fn fixture() -> Collections {
        let run = |id: &str, exp: &str, started: &str| Run {
            run_id: id.to_string(),
            experiment_id: exp.to_string(),
            run_name: None,
            status: RunStatus::Finished,
            started_at: Some(started.to_string()),
            finished_at: None,
        };
        Collections {
            projects: vec![Project {
                project_id: "p1".to_string(),
                name: "Alpha".to_string(),
                description: None,
                status: None,
            }],
            experiments: vec![Experiment {
                experiment_id: "e1".to_string(),
                project_id: "p1".to_string(),
                name: "baseline".to_string(),
                objective: None,
            }],
            runs: vec![
                run("run-aaaaaaaa", "e1", "2024-01-01T00:00:00Z"),
                run("run-bbbbbbbb", "e1", "2024-02-01T00:00:00Z"),
                run("run-orphan01", "gone", "2024-03-01T00:00:00Z"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_runs_view_lists_project_runs_newest_first() {
        let state = loaded_state();
        let out = render_runs(&state);
        assert!(out.contains("project Alpha"));
        let newer = out.find("run-bb...bbbb").unwrap();
        let older = out.find("run-aa...aaaa").unwrap();
        assert!(newer < older);
        assert!(!out.contains("run-or"));
        assert!(out.contains("2024-02-01"));
    }

    #[test]
    fn test_empty_views_show_placeholders() {
        let state = DashboardState::default();
        assert!(render_runs(&state).contains("No runs yet"));
        assert!(render_leaderboard(&state).contains("No leaderboard data"));
        let overview = render_overview(&state);
        assert!(overview.contains("success rate       -"));
        assert!(render_imports(&state).contains("/api/batch-import"));
    }

    #[test]
    fn test_error_is_shown_in_header() {
        let mut state = DashboardState::default();
        let commands = reduce(&mut state, Event::SignedIn(Credential::bearer("u", "t")));
        let epoch: Epoch = match &commands[0] {
            crate::sync::Command::LoadCollections { epoch, .. } => *epoch,
            other => panic!("unexpected {:?}", other),
        };
        reduce(
            &mut state,
            Event::CollectionsLoaded {
                epoch,
                result: Err(crate::client::TransportError::Status {
                    status: 401,
                    message: "Invalid token".to_string(),
                }),
            },
        );
        assert!(render_overview(&state).contains("error: Invalid token"));
    }
}
