//! Integration test: stale-response discard with real tokio tasks.
//!
//! The transport parks every request until the test releases it, so the
//! order in which responses arrive is chosen by the test, not the network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use runatlas::client::{Transport, TransportError};
use runatlas::model::Scope;
use runatlas::session::Credential;
use runatlas::sync::loader::{DATASETS_PATH, EXPERIMENTS_PATH, METRICS_PATH, PROJECTS_PATH, RUNS_PATH};
use runatlas::sync::{DashboardState, Event, SyncRuntime, View};

type Reply = Result<Option<Value>, TransportError>;

#[derive(Default)]
struct GatedTransport {
    pending: Mutex<Vec<(String, oneshot::Sender<Reply>)>>,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn get_json(&self, path: &str, credential: Option<&Credential>) -> Reply {
        assert!(credential.is_some(), "request without credential: {}", path);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push((path.to_string(), tx));
        rx.await
            .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".to_string())))
    }
}

impl GatedTransport {
    /// Wait until a request whose path starts with `prefix` is parked, then answer it.
    async fn release(&self, prefix: &str, newest: bool, reply: Reply) {
        for _ in 0..2000 {
            let sender = {
                let mut pending = self.pending.lock().unwrap();
                let mut matches = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, (p, _))| p.starts_with(prefix))
                    .map(|(i, _)| i);
                let idx = if newest { matches.last() } else { matches.next() };
                idx.map(|i| pending.remove(i).1)
            };
            if let Some(tx) = sender {
                let _ = tx.send(reply);
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("no request for {} was issued", prefix);
    }

    async fn release_batch(&self, newest: bool, project_id: &str) {
        self.release(
            PROJECTS_PATH,
            newest,
            Ok(Some(json!([{"project_id": project_id, "name": project_id}]))),
        )
        .await;
        self.release(
            EXPERIMENTS_PATH,
            newest,
            Ok(Some(json!([{"experiment_id": "e1", "project_id": project_id, "name": "baseline"}]))),
        )
        .await;
        self.release(
            METRICS_PATH,
            newest,
            Ok(Some(json!([{"metric_id": "m1", "key": "acc", "display_name": "Accuracy"}]))),
        )
        .await;
        self.release(RUNS_PATH, newest, Ok(Some(json!([])))).await;
        self.release(DATASETS_PATH, newest, Ok(None)).await;
    }
}

fn rows(run_id: &str) -> Reply {
    Ok(Some(json!([{"run_id": run_id, "metric_value": 0.9, "status": "finished"}])))
}

fn leaderboard_run(runtime: &SyncRuntime<GatedTransport>) -> Option<String> {
    runtime
        .state()
        .leaderboard()
        .current()
        .and_then(|rows| rows.first())
        .map(|row| row.run_id.clone())
}

const VAL_QUERY: &str = "/reports/experiments/e1/leaderboard?metric_key=acc&scope=val";
const TEST_QUERY: &str = "/reports/experiments/e1/leaderboard?metric_key=acc&scope=test";

async fn signed_in_on_leaderboard() -> (Arc<GatedTransport>, SyncRuntime<GatedTransport>) {
    let transport = Arc::new(GatedTransport::default());
    let mut runtime = SyncRuntime::new(Arc::clone(&transport), DashboardState::default());
    runtime.dispatch(Event::Show(View::Leaderboard));
    runtime.dispatch(Event::SignedIn(Credential::bearer("u1", "token")));
    transport.release_batch(false, "p1").await;
    assert!(runtime.step().await);
    assert_eq!(runtime.state().selection().experiment_id, "e1");
    assert_eq!(runtime.state().selection().metric_key, "acc");
    (transport, runtime)
}

#[tokio::test]
async fn test_late_val_response_after_scope_change_is_dropped() {
    let (transport, mut runtime) = signed_in_on_leaderboard().await;

    runtime.dispatch(Event::SetScope(Scope::Test));
    transport.release(TEST_QUERY, false, rows("run-test")).await;
    assert!(runtime.step().await);
    assert_eq!(leaderboard_run(&runtime).as_deref(), Some("run-test"));

    transport.release(VAL_QUERY, false, rows("run-val")).await;
    assert!(runtime.step().await);
    assert_eq!(leaderboard_run(&runtime).as_deref(), Some("run-test"));
    assert!(runtime.state().error().is_none());
}

#[tokio::test]
async fn test_old_scope_arriving_first_never_shows() {
    let (transport, mut runtime) = signed_in_on_leaderboard().await;

    runtime.dispatch(Event::SetScope(Scope::Test));
    transport.release(VAL_QUERY, false, rows("run-val")).await;
    assert!(runtime.step().await);
    assert_eq!(leaderboard_run(&runtime), None);
    assert!(runtime.state().leaderboard().is_loading());

    transport.release(TEST_QUERY, false, rows("run-test")).await;
    runtime.run_until_idle().await;
    assert_eq!(leaderboard_run(&runtime).as_deref(), Some("run-test"));
}

#[tokio::test]
async fn test_stale_report_failure_is_not_surfaced() {
    let (transport, mut runtime) = signed_in_on_leaderboard().await;

    runtime.dispatch(Event::SetScope(Scope::Test));
    transport
        .release(
            VAL_QUERY,
            false,
            Err(TransportError::Status { status: 500, message: "boom".to_string() }),
        )
        .await;
    assert!(runtime.step().await);
    assert!(runtime.state().error().is_none());

    transport.release(TEST_QUERY, false, rows("run-test")).await;
    runtime.run_until_idle().await;
    assert!(runtime.state().error().is_none());
}

#[tokio::test]
async fn test_refresh_mid_flight_drops_the_old_batch() {
    let transport = Arc::new(GatedTransport::default());
    let mut runtime = SyncRuntime::new(Arc::clone(&transport), DashboardState::default());
    runtime.dispatch(Event::Show(View::Runs));
    runtime.dispatch(Event::SignedIn(Credential::bearer("u1", "token")));
    runtime.dispatch(Event::Refresh);

    // Newer batch lands first, then the superseded one.
    transport.release_batch(true, "p-new").await;
    assert!(runtime.step().await);
    assert_eq!(runtime.state().collections().projects[0].project_id, "p-new");
    assert!(!runtime.state().is_loading());

    transport.release_batch(false, "p-old").await;
    assert!(runtime.step().await);
    assert_eq!(runtime.state().collections().projects[0].project_id, "p-new");
    assert_eq!(runtime.state().selection().project_id, "p-new");
}

#[tokio::test]
async fn test_sign_out_discards_in_flight_batch() {
    let transport = Arc::new(GatedTransport::default());
    let mut runtime = SyncRuntime::new(Arc::clone(&transport), DashboardState::default());
    runtime.dispatch(Event::SignedIn(Credential::bearer("u1", "token")));
    runtime.dispatch(Event::SignedOut);
    assert!(!runtime.state().has_in_flight());

    transport.release_batch(false, "p1").await;
    assert!(runtime.step().await);
    assert!(runtime.state().collections().projects.is_empty());
    assert!(runtime.state().selection().project_id.is_empty());
}
