//! Selection Resolver.
//!
//! The selection chain is project -> experiment -> metric/scope/limit. After
//! any change to the collections or to the selection, `resolve` repairs it:
//!
//! 1. A project id that is no longer loaded is cleared.
//! 2. No project selected and projects exist: pick the first (server order).
//! 3. Leaderboard experiment not among the project's experiments: pick the
//!    first project experiment, or clear when there is none.
//! 4. Run-filter experiment set but not among the project's experiments:
//!    clear it ("all experiments" is a valid filter).
//! 5. A metric key that is no longer loaded is cleared.
//! 6. No metric selected and metrics exist: pick the first metric's key.
//!
//! Rules run to a fixpoint; on a consistent state they change nothing.

use serde::Serialize;

use super::loader::Collections;
use super::views::project_experiments;
use crate::config::MAX_LEADERBOARD_LIMIT;
use crate::model::Scope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub project_id: String,
    /// Leaderboard context.
    pub experiment_id: String,
    /// Runs-list filter; empty means all experiments of the project.
    pub run_experiment_id: String,
    pub metric_key: String,
    pub scope: Scope,
    pub limit: u32,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(Scope::Val, 10)
    }
}

impl Selection {
    pub fn new(scope: Scope, limit: u32) -> Self {
        Self {
            project_id: String::new(),
            experiment_id: String::new(),
            run_experiment_id: String::new(),
            metric_key: String::new(),
            scope,
            limit: limit.min(MAX_LEADERBOARD_LIMIT),
        }
    }

    /// 0 is allowed and means "no leaderboard query".
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.min(MAX_LEADERBOARD_LIMIT);
    }

    /// Drop every referent, keep scope and limit.
    pub fn clear_referents(&mut self) {
        self.project_id.clear();
        self.experiment_id.clear();
        self.run_experiment_id.clear();
        self.metric_key.clear();
    }
}

/// One change made by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "repair", rename_all = "snake_case")]
pub enum Repair {
    ProjectCleared { from: String },
    ProjectDefaulted { to: String },
    ExperimentReselected { from: String, to: String },
    ExperimentCleared { from: String },
    RunFilterCleared { from: String },
    MetricCleared { from: String },
    MetricDefaulted { to: String },
}

// Rules only feed rules later in the same pass, so the second pass is a no-op.
const MAX_PASSES: usize = 3;

/// Apply the rules until nothing changes; returns what was changed.
pub fn resolve(collections: &Collections, selection: &mut Selection) -> Vec<Repair> {
    let mut repairs = Vec::new();
    for _ in 0..MAX_PASSES {
        let before = repairs.len();
        resolve_pass(collections, selection, &mut repairs);
        if repairs.len() == before {
            break;
        }
    }
    repairs
}

fn resolve_pass(collections: &Collections, sel: &mut Selection, repairs: &mut Vec<Repair>) {
    if !sel.project_id.is_empty() && !collections.has_project(&sel.project_id) {
        repairs.push(Repair::ProjectCleared {
            from: std::mem::take(&mut sel.project_id),
        });
    }
    if sel.project_id.is_empty() {
        if let Some(first) = collections.projects.first() {
            sel.project_id = first.project_id.clone();
            repairs.push(Repair::ProjectDefaulted {
                to: sel.project_id.clone(),
            });
        }
    }

    let scoped = project_experiments(&collections.experiments, &sel.project_id);
    let in_project = |id: &str| scoped.iter().any(|e| e.experiment_id == id);

    if !in_project(sel.experiment_id.as_str()) {
        match scoped.first() {
            Some(first) => {
                let from = std::mem::replace(&mut sel.experiment_id, first.experiment_id.clone());
                repairs.push(Repair::ExperimentReselected {
                    from,
                    to: sel.experiment_id.clone(),
                });
            }
            None if !sel.experiment_id.is_empty() => {
                repairs.push(Repair::ExperimentCleared {
                    from: std::mem::take(&mut sel.experiment_id),
                });
            }
            None => {}
        }
    }

    if !sel.run_experiment_id.is_empty() && !in_project(sel.run_experiment_id.as_str()) {
        repairs.push(Repair::RunFilterCleared {
            from: std::mem::take(&mut sel.run_experiment_id),
        });
    }

    if !sel.metric_key.is_empty() && !collections.has_metric(&sel.metric_key) {
        repairs.push(Repair::MetricCleared {
            from: std::mem::take(&mut sel.metric_key),
        });
    }
    if sel.metric_key.is_empty() {
        if let Some(first) = collections.metrics.first() {
            sel.metric_key = first.key.clone();
            repairs.push(Repair::MetricDefaulted {
                to: sel.metric_key.clone(),
            });
        }
    }
}

/// Every referent invariant that must hold after `resolve`. Empty when consistent.
pub fn check_invariants(collections: &Collections, sel: &Selection) -> Vec<String> {
    let mut violations = Vec::new();
    if !sel.project_id.is_empty() && !collections.has_project(&sel.project_id) {
        violations.push(format!("project '{}' is not loaded", sel.project_id));
    }
    let scoped = project_experiments(&collections.experiments, &sel.project_id);
    for (label, id) in [
        ("experiment", &sel.experiment_id),
        ("run filter experiment", &sel.run_experiment_id),
    ] {
        if !id.is_empty() && !scoped.iter().any(|e| &e.experiment_id == id) {
            violations.push(format!("{} '{}' is outside project '{}'", label, id, sel.project_id));
        }
    }
    if !sel.metric_key.is_empty() && !collections.has_metric(&sel.metric_key) {
        violations.push(format!("metric '{}' is not loaded", sel.metric_key));
    }
    violations
}
