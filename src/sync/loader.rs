//! Collection Loader: the five base collections, fetched as one batch.
//!
//! A batch either commits all five collections together or nothing. Each
//! batch is stamped with an epoch at start; a batch whose epoch has been
//! superseded by the time it resolves is dropped without an error.

use std::sync::Arc;

use super::epoch::{Epoch, EpochCounter};
use crate::client::{fetch_json, Transport, TransportError};
use crate::model::{Dataset, Experiment, MetricDefinition, Project, Run};
use crate::session::Credential;

pub const PROJECTS_PATH: &str = "/projects?limit=500";
pub const EXPERIMENTS_PATH: &str = "/experiments?limit=500";
pub const METRICS_PATH: &str = "/metric-definitions?limit=200";
pub const RUNS_PATH: &str = "/runs?limit=200";
pub const DATASETS_PATH: &str = "/datasets?limit=200";

/// One committed snapshot of every base collection, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub projects: Vec<Project>,
    pub experiments: Vec<Experiment>,
    pub metrics: Vec<MetricDefinition>,
    pub runs: Vec<Run>,
    pub datasets: Vec<Dataset>,
}

impl Collections {
    pub fn has_project(&self, project_id: &str) -> bool {
        self.projects.iter().any(|p| p.project_id == project_id)
    }

    pub fn has_metric(&self, key: &str) -> bool {
        self.metrics.iter().any(|m| m.key == key)
    }
}

/// Issue all five fetches concurrently; the first failure fails the batch.
pub async fn fetch_collections<T: Transport + ?Sized>(
    transport: &T,
    credential: &Credential,
) -> Result<Collections, TransportError> {
    let (projects, experiments, metrics, runs, datasets) = tokio::try_join!(
        fetch_json::<T, Vec<Project>>(transport, PROJECTS_PATH, credential),
        fetch_json::<T, Vec<Experiment>>(transport, EXPERIMENTS_PATH, credential),
        fetch_json::<T, Vec<MetricDefinition>>(transport, METRICS_PATH, credential),
        fetch_json::<T, Vec<Run>>(transport, RUNS_PATH, credential),
        fetch_json::<T, Vec<Dataset>>(transport, DATASETS_PATH, credential),
    )?;
    Ok(Collections {
        projects,
        experiments,
        metrics,
        runs,
        datasets,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Committed,
    Failed(String),
    /// A newer batch was started; this result was dropped.
    Stale,
}

impl LoadOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            LoadOutcome::Committed => "committed",
            LoadOutcome::Failed(_) => "failed",
            LoadOutcome::Stale => "stale",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LoadOutcome::Failed(m) => Some(m),
            _ => None,
        }
    }
}

/// Owns the committed collections and the batch epoch.
#[derive(Debug, Default)]
pub struct CollectionLoader {
    epoch: EpochCounter,
    committed: Arc<Collections>,
    generation: u64,
    in_flight: Option<Epoch>,
}

impl CollectionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a batch. Any batch still in flight is superseded.
    pub fn begin(&mut self) -> Epoch {
        let epoch = self.epoch.advance();
        self.in_flight = Some(epoch);
        epoch
    }

    pub fn complete(
        &mut self,
        epoch: Epoch,
        result: Result<Collections, TransportError>,
    ) -> LoadOutcome {
        if !self.epoch.is_current(epoch) {
            return LoadOutcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(collections) => {
                self.committed = Arc::new(collections);
                self.generation += 1;
                LoadOutcome::Committed
            }
            Err(e) => LoadOutcome::Failed(e.to_string()),
        }
    }

    /// Drop committed data and supersede any in-flight batch.
    pub fn reset(&mut self) {
        self.epoch.advance();
        self.in_flight = None;
        self.committed = Arc::new(Collections::default());
        self.generation += 1;
    }

    pub fn collections(&self) -> &Arc<Collections> {
        &self.committed
    }

    /// Bumped on every commit or reset; derived views key on it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn sample() -> Collections {
        Collections {
            projects: vec![Project {
                project_id: "p1".to_string(),
                name: "Alpha".to_string(),
                description: None,
                status: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_commit_current_batch() {
        let mut loader = CollectionLoader::new();
        let epoch = loader.begin();
        assert!(loader.is_loading());
        assert_eq!(loader.complete(epoch, Ok(sample())), LoadOutcome::Committed);
        assert!(!loader.is_loading());
        assert_eq!(loader.collections().projects.len(), 1);
        assert_eq!(loader.generation(), 1);
    }

    #[test]
    fn test_superseded_batch_never_commits() {
        let mut loader = CollectionLoader::new();
        let old = loader.begin();
        let new = loader.begin();
        assert_eq!(loader.complete(new, Ok(Collections::default())), LoadOutcome::Committed);
        // Old batch arrives late with data; it must not overwrite.
        assert_eq!(loader.complete(old, Ok(sample())), LoadOutcome::Stale);
        assert!(loader.collections().projects.is_empty());
        assert_eq!(loader.generation(), 1);
    }

    #[test]
    fn test_failure_keeps_previous_commit() {
        let mut loader = CollectionLoader::new();
        let first = loader.begin();
        loader.complete(first, Ok(sample()));
        let second = loader.begin();
        let outcome = loader.complete(
            second,
            Err(TransportError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
            }),
        );
        assert_eq!(outcome, LoadOutcome::Failed("Internal Server Error".to_string()));
        assert_eq!(loader.collections().projects.len(), 1);
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_reset_supersedes_in_flight() {
        let mut loader = CollectionLoader::new();
        let epoch = loader.begin();
        loader.reset();
        assert!(!loader.is_loading());
        assert_eq!(loader.complete(epoch, Ok(sample())), LoadOutcome::Stale);
        assert!(loader.collections().projects.is_empty());
    }

    struct FixtureTransport {
        fail_path: Option<&'static str>,
    }

    #[async_trait]
    impl Transport for FixtureTransport {
        async fn get_json(
            &self,
            path: &str,
            credential: Option<&Credential>,
        ) -> Result<Option<Value>, TransportError> {
            assert!(credential.is_some());
            if Some(path) == self.fail_path {
                return Err(TransportError::Status {
                    status: 403,
                    message: "Not a project member".to_string(),
                });
            }
            Ok(match path {
                PROJECTS_PATH => Some(json!([{"project_id": "p1", "name": "Alpha"}])),
                EXPERIMENTS_PATH => {
                    Some(json!([{"experiment_id": "e1", "project_id": "p1", "name": "base"}]))
                }
                METRICS_PATH => {
                    Some(json!([{"metric_id": "m1", "key": "acc", "display_name": "Accuracy"}]))
                }
                RUNS_PATH => Some(json!([{"run_id": "r1", "experiment_id": "e1", "status": "running"}])),
                DATASETS_PATH => None,
                other => panic!("unexpected path {}", other),
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_collections_all_five() {
        let transport = FixtureTransport { fail_path: None };
        let cred = Credential::bearer("u1", "t");
        let c = fetch_collections(&transport, &cred).await.unwrap();
        assert_eq!(c.projects[0].project_id, "p1");
        assert_eq!(c.experiments[0].experiment_id, "e1");
        assert_eq!(c.metrics[0].key, "acc");
        assert_eq!(c.runs.len(), 1);
        // A null body is an empty collection.
        assert!(c.datasets.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_collections_one_failure_fails_batch() {
        let transport = FixtureTransport { fail_path: Some(RUNS_PATH) };
        let cred = Credential::bearer("u1", "t");
        let err = fetch_collections(&transport, &cred).await.unwrap_err();
        assert_eq!(err.to_string(), "Not a project member");
    }

    #[tokio::test]
    async fn test_fetch_collections_bad_shape_is_decode_error() {
        struct Garbage;
        #[async_trait]
        impl Transport for Garbage {
            async fn get_json(
                &self,
                _path: &str,
                _credential: Option<&Credential>,
            ) -> Result<Option<Value>, TransportError> {
                Ok(Some(json!({"not": "a list"})))
            }
        }
        let err = fetch_collections(&Garbage, &Credential::bearer("u1", "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }
}
