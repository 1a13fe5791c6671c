//! Pure reducer: (DashboardState, Event) -> Vec<Command>
//!
//! All state transitions happen here. The reducer never touches the network;
//! it returns commands, and their completions come back as events. After
//! every event the state is settled: the selection is repaired, derived views
//! are refreshed if their inputs moved, and report queries are re-keyed.

use serde_json::{to_value, Map, Value};

use super::events::{Command, Event, View};
use super::loader::{Collections, LoadOutcome};
use super::reports::{DashboardKey, LeaderboardKey, ReportOutcome};
use super::selection::resolve;
use super::state::DashboardState;
use crate::logging::{log, obj, v_bool, v_str, v_u64, Domain, Level};

pub fn reduce(state: &mut DashboardState, event: Event) -> Vec<Command> {
    state.seq += 1;
    log(
        Level::Trace,
        Domain::System,
        "event",
        obj(&[("name", v_str(event.name())), ("seq", v_u64(state.seq))]),
    );

    let mut commands = Vec::new();
    match event {
        Event::SignedIn(credential) => {
            log(
                Level::Info,
                Domain::Session,
                "signed_in",
                obj(&[
                    ("user_id", v_str(&credential.user_id)),
                    ("token_fp", v_str(&credential.fingerprint())),
                ]),
            );
            if state.credential.as_ref() == Some(&credential) {
                state.dashboard.invalidate();
                state.leaderboard.invalidate();
            } else {
                // Another session's data must not key requests under this credential.
                drop_session_data(state);
            }
            state.credential = Some(credential);
            commands.extend(begin_load(state));
        }
        Event::SignedOut => {
            state.credential = None;
            drop_session_data(state);
            log(Level::Info, Domain::Session, "signed_out", obj(&[]));
        }
        Event::Refresh => {
            state.refresh_token += 1;
            state.dashboard.invalidate();
            state.leaderboard.invalidate();
            commands.extend(begin_load(state));
        }
        Event::SelectProject(id) => state.selection.project_id = id,
        Event::SelectExperiment(id) => state.selection.experiment_id = id,
        Event::FilterRunsByExperiment(id) => state.selection.run_experiment_id = id,
        Event::SelectMetric(key) => state.selection.metric_key = key,
        Event::SetScope(scope) => state.selection.scope = scope,
        Event::SetLimit(limit) => state.selection.set_limit(limit),
        Event::Show(view) => state.view = view,

        Event::CollectionsLoaded { epoch, result } => {
            let outcome = state.loader.complete(epoch, result);
            let counts = match outcome {
                LoadOutcome::Committed => collection_counts(state.loader.collections()),
                _ => Vec::new(),
            };
            log_outcome(Domain::Loader, "collections", epoch.get(), outcome.label(), outcome.message(), &counts);
            if let LoadOutcome::Failed(message) = outcome {
                state.error = Some(message);
            }
        }
        Event::DashboardLoaded { ticket, result } => {
            let epoch = ticket.epoch.get();
            let outcome = state.dashboard.complete(ticket, result.map_err(|e| e.to_string()));
            log_outcome(Domain::Report, "dashboard", epoch, outcome.label(), outcome.message(), &[]);
            if let ReportOutcome::Failed(message) = outcome {
                state.error = Some(message);
            }
        }
        Event::LeaderboardLoaded { ticket, result } => {
            let epoch = ticket.epoch.get();
            let outcome = state.leaderboard.complete(ticket, result.map_err(|e| e.to_string()));
            log_outcome(Domain::Report, "leaderboard", epoch, outcome.label(), outcome.message(), &[]);
            if let ReportOutcome::Failed(message) = outcome {
                state.error = Some(message);
            }
        }
    }

    commands.extend(settle(state));
    commands
}

fn drop_session_data(state: &mut DashboardState) {
    state.loader.reset();
    state.dashboard.reset();
    state.leaderboard.reset();
    state.selection.clear_referents();
    state.error = None;
}

fn begin_load(state: &mut DashboardState) -> Option<Command> {
    let credential = state.credential.clone()?;
    let epoch = state.loader.begin();
    state.error = None;
    log(
        Level::Info,
        Domain::Loader,
        "collections.begin",
        obj(&[
            ("epoch", v_u64(epoch.get())),
            ("refresh_token", v_u64(state.refresh_token)),
        ]),
    );
    Some(Command::LoadCollections { epoch, credential })
}

/// Bring selection, views, and report keys in line with the current inputs.
fn settle(state: &mut DashboardState) -> Vec<Command> {
    let collections = state.loader.collections().clone();
    let repairs = resolve(&collections, &mut state.selection);
    for repair in &repairs {
        log(
            Level::Debug,
            Domain::Selection,
            "selection.repair",
            to_value(repair).ok().and_then(|v| v.as_object().cloned()).unwrap_or_default(),
        );
    }

    if state.views.refresh(state.loader.generation(), &collections, &state.selection) {
        let views = state.views.views();
        log(
            Level::Debug,
            Domain::View,
            "views.recomputed",
            obj(&[
                ("project_id", v_str(&state.selection.project_id)),
                ("project_runs", v_u64(views.project_runs.len() as u64)),
                ("filtered_runs", v_u64(views.filtered_runs.len() as u64)),
            ]),
        );
    }

    plan_reports(state)
}

fn plan_reports(state: &mut DashboardState) -> Vec<Command> {
    let mut commands = Vec::new();
    let Some(credential) = state.credential.clone() else {
        return commands;
    };

    let dashboard_key = match state.view {
        View::Overview => DashboardKey::from_selection(&state.selection),
        _ => None,
    };
    if let Some(ticket) = state.dashboard.request(dashboard_key) {
        log(
            Level::Debug,
            Domain::Report,
            "dashboard.request",
            obj(&[
                ("epoch", v_u64(ticket.epoch.get())),
                ("project_id", v_str(&ticket.key.project_id)),
            ]),
        );
        commands.push(Command::FetchDashboard {
            ticket,
            credential: credential.clone(),
        });
    }

    let leaderboard_key = match state.view {
        View::Leaderboard => LeaderboardKey::from_selection(&state.selection),
        _ => None,
    };
    if let Some(ticket) = state.leaderboard.request(leaderboard_key) {
        log(
            Level::Debug,
            Domain::Report,
            "leaderboard.request",
            obj(&[
                ("epoch", v_u64(ticket.epoch.get())),
                ("experiment_id", v_str(&ticket.key.experiment_id)),
                ("metric_key", v_str(&ticket.key.metric_key)),
                ("scope", v_str(ticket.key.scope.as_str())),
                ("limit", v_u64(ticket.key.limit as u64)),
            ]),
        );
        commands.push(Command::FetchLeaderboard { ticket, credential });
    }

    commands
}

fn collection_counts(c: &Collections) -> Vec<(&'static str, Value)> {
    vec![
        ("projects", v_u64(c.projects.len() as u64)),
        ("experiments", v_u64(c.experiments.len() as u64)),
        ("metrics", v_u64(c.metrics.len() as u64)),
        ("runs", v_u64(c.runs.len() as u64)),
        ("datasets", v_u64(c.datasets.len() as u64)),
    ]
}

fn outcome_fields(
    query: &str,
    epoch: u64,
    label: &str,
    message: Option<&str>,
    extra: &[(&str, Value)],
) -> Map<String, Value> {
    let mut fields = obj(&[
        ("query", v_str(query)),
        ("epoch", v_u64(epoch)),
        ("stale", v_bool(label == "stale")),
    ]);
    if let Some(m) = message {
        fields.insert("msg".to_string(), v_str(m));
    }
    for (k, v) in extra {
        fields.insert(k.to_string(), v.clone());
    }
    fields
}

fn log_outcome(
    domain: Domain,
    query: &str,
    epoch: u64,
    label: &str,
    message: Option<&str>,
    extra: &[(&str, Value)],
) {
    let level = match label {
        "failed" => Level::Warn,
        "stale" => Level::Debug,
        _ => Level::Info,
    };
    let fields = outcome_fields(query, epoch, label, message, extra);
    log(level, domain, &format!("{}.{}", query, label), fields);
}
