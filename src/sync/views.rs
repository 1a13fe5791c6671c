//! Derived View Builder: pure projections over (collections, selection).
//!
//! `ViewCache` recomputes only when the collection generation, the selected
//! project, or the run filter changes; every other selection change leaves
//! the derived views untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::loader::Collections;
use super::selection::Selection;
use crate::model::{Experiment, Run, RunStatus};

pub const RECENT_RUNS_LIMIT: usize = 6;

/// Experiments of `project_id`, or all experiments when no project is selected.
pub fn project_experiments<'a>(experiments: &'a [Experiment], project_id: &str) -> Vec<&'a Experiment> {
    experiments
        .iter()
        .filter(|e| project_id.is_empty() || e.project_id == project_id)
        .collect()
}

/// Runs belonging to `experiments`, or all runs when no project is selected.
pub fn project_runs(runs: &[Run], experiments: &[&Experiment], project_id: &str) -> Vec<Run> {
    if project_id.is_empty() {
        return runs.to_vec();
    }
    let ids: HashSet<&str> = experiments.iter().map(|e| e.experiment_id.as_str()).collect();
    runs.iter()
        .filter(|r| ids.contains(r.experiment_id.as_str()))
        .cloned()
        .collect()
}

/// Narrow to one experiment; an empty filter keeps everything.
pub fn filter_runs(runs: &[Run], experiment_id: &str) -> Vec<Run> {
    if experiment_id.is_empty() {
        return runs.to_vec();
    }
    runs.iter()
        .filter(|r| r.experiment_id == experiment_id)
        .cloned()
        .collect()
}

/// Newest first by start timestamp text; missing timestamps go last. Stable.
pub fn sort_runs_by_start(runs: &[Run]) -> Vec<Run> {
    let mut sorted = runs.to_vec();
    sorted.sort_by(|a, b| b.start_key().cmp(a.start_key()));
    sorted
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
    pub killed: usize,
}

impl StatusCounts {
    pub fn get(&self, status: RunStatus) -> usize {
        match status {
            RunStatus::Queued => self.queued,
            RunStatus::Running => self.running,
            RunStatus::Finished => self.finished,
            RunStatus::Failed => self.failed,
            RunStatus::Killed => self.killed,
            RunStatus::Unknown => 0,
        }
    }

    fn bump(&mut self, status: RunStatus) {
        match status {
            RunStatus::Queued => self.queued += 1,
            RunStatus::Running => self.running += 1,
            RunStatus::Finished => self.finished += 1,
            RunStatus::Failed => self.failed += 1,
            RunStatus::Killed => self.killed += 1,
            RunStatus::Unknown => {}
        }
    }

    pub fn total(&self) -> usize {
        RunStatus::KNOWN.iter().map(|s| self.get(*s)).sum()
    }
}

pub fn status_counts(runs: &[Run]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for run in runs {
        counts.bump(run.status);
    }
    counts
}

pub fn recent_runs(sorted: &[Run]) -> Vec<Run> {
    sorted.iter().take(RECENT_RUNS_LIMIT).cloned().collect()
}

pub fn experiment_lookup(experiments: &[Experiment]) -> HashMap<String, Experiment> {
    experiments
        .iter()
        .map(|e| (e.experiment_id.clone(), e.clone()))
        .collect()
}

/// Everything the presentation layer reads besides the raw collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedViews {
    pub project_experiments: Vec<Experiment>,
    pub project_runs: Vec<Run>,
    pub filtered_runs: Vec<Run>,
    pub sorted_runs: Vec<Run>,
    pub sorted_project_runs: Vec<Run>,
    pub status_counts: StatusCounts,
    pub recent_runs: Vec<Run>,
    pub experiment_lookup: HashMap<String, Experiment>,
}

pub fn build(collections: &Collections, selection: &Selection) -> DerivedViews {
    let scoped = project_experiments(&collections.experiments, &selection.project_id);
    let project_runs = project_runs(&collections.runs, &scoped, &selection.project_id);
    let filtered_runs = filter_runs(&project_runs, &selection.run_experiment_id);
    let sorted_runs = sort_runs_by_start(&filtered_runs);
    let sorted_project_runs = sort_runs_by_start(&project_runs);
    DerivedViews {
        project_experiments: scoped.into_iter().cloned().collect(),
        status_counts: status_counts(&project_runs),
        recent_runs: recent_runs(&sorted_project_runs),
        experiment_lookup: experiment_lookup(&collections.experiments),
        project_runs,
        filtered_runs,
        sorted_runs,
        sorted_project_runs,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    generation: u64,
    project_id: String,
    run_experiment_id: String,
}

#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<ViewKey>,
    views: Arc<DerivedViews>,
}

impl ViewCache {
    /// Returns true when the views were recomputed.
    pub fn refresh(&mut self, generation: u64, collections: &Collections, selection: &Selection) -> bool {
        let key = ViewKey {
            generation,
            project_id: selection.project_id.clone(),
            run_experiment_id: selection.run_experiment_id.clone(),
        };
        if self.key.as_ref() == Some(&key) {
            return false;
        }
        self.views = Arc::new(build(collections, selection));
        self.key = Some(key);
        true
    }

    pub fn views(&self) -> &Arc<DerivedViews> {
        &self.views
    }
}
