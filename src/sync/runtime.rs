//! Async driver for the reducer.
//!
//! The runtime owns the state and is the only thing that mutates it. Each
//! command runs as its own tokio task that performs the network call and
//! sends the completion back over a channel; the owner applies completions
//! one at a time through `reduce`. Superseded requests still run to the end,
//! and their results are dropped by the epoch checks when applied.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::events::{Command, Event};
use super::loader::fetch_collections;
use super::reducer::reduce;
use super::state::DashboardState;
use crate::client::{fetch_json, Transport, TransportError};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::model::{LeaderboardRow, ProjectDashboard};

pub struct SyncRuntime<T: Transport + 'static> {
    transport: Arc<T>,
    state: DashboardState,
    tx: UnboundedSender<Event>,
    rx: UnboundedReceiver<Event>,
}

impl<T: Transport + 'static> SyncRuntime<T> {
    pub fn new(transport: Arc<T>, state: DashboardState) -> Self {
        let (tx, rx) = unbounded_channel();
        Self { transport, state, tx, rx }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Apply one event and launch whatever network work it asks for.
    pub fn dispatch(&mut self, event: Event) {
        for command in reduce(&mut self.state, event) {
            self.spawn(command);
        }
    }

    fn spawn(&self, command: Command) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = execute(transport.as_ref(), command).await;
            // Receiver gone means the runtime was dropped; nothing to deliver to.
            let _ = tx.send(event);
        });
    }

    /// Wait for the next completion and apply it. Returns false if none can arrive.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no current request is outstanding.
    pub async fn run_until_idle(&mut self) {
        while self.state.has_in_flight() {
            if !self.step().await {
                break;
            }
        }
    }
}

fn log_fetch(what: &str, started: Instant, failure: Option<&TransportError>) {
    let mut fields = obj(&[
        ("query", v_str(what)),
        ("elapsed_ms", v_num(started.elapsed().as_secs_f64() * 1000.0)),
    ]);
    if let Some(err) = failure {
        fields.insert("msg".to_string(), v_str(&err.to_string()));
    }
    let level = if failure.is_some() { Level::Warn } else { Level::Debug };
    log(level, Domain::Transport, "fetch.done", fields);
}

/// Perform the network side of a command and wrap the result as its completion event.
pub async fn execute<T: Transport + ?Sized>(transport: &T, command: Command) -> Event {
    let started = Instant::now();
    match command {
        Command::LoadCollections { epoch, credential } => {
            let result = fetch_collections(transport, &credential).await;
            log_fetch("collections", started, result.as_ref().err());
            Event::CollectionsLoaded { epoch, result }
        }
        Command::FetchDashboard { ticket, credential } => {
            let result =
                fetch_json::<T, ProjectDashboard>(transport, &ticket.key.path(), &credential).await;
            log_fetch("dashboard", started, result.as_ref().err());
            Event::DashboardLoaded { ticket, result }
        }
        Command::FetchLeaderboard { ticket, credential } => {
            let result =
                fetch_json::<T, Vec<LeaderboardRow>>(transport, &ticket.key.path(), &credential).await;
            log_fetch("leaderboard", started, result.as_ref().err());
            Event::LeaderboardLoaded { ticket, result }
        }
    }
}
