use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use runatlas::client::HttpTransport;
use runatlas::config::Config;
use runatlas::logging::{log, obj, v_str, Domain, Level};
use runatlas::model::Scope;
use runatlas::render;
use runatlas::session::{Credential, SessionStore, SqliteSessionStore};
use runatlas::sync::{DashboardState, Event, SyncRuntime, View};

fn print_usage() {
    eprintln!(
        "usage: runatlas <command> [flags]

commands:
  signin        store a credential (RUNATLAS_USER_ID, RUNATLAS_TOKEN, RUNATLAS_TOKEN_TYPE)
  signout       forget the stored credential
  overview      project dashboard, run health, datasets
  leaderboard   ranked runs for an experiment and metric
  runs          latest runs of the selected project
  imports       batch import notes

flags:
  --project <id>  --experiment <id>  --metric <key>  --scope train|val|test  --limit <n>"
    );
}

/// Selection overrides given on the command line.
#[derive(Debug, Default, PartialEq)]
struct Flags {
    project: Option<String>,
    experiment: Option<String>,
    metric: Option<String>,
    scope: Option<Scope>,
    limit: Option<u32>,
}

fn parse_flags(args: &[String]) -> Result<Flags> {
    let mut flags = Flags::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("missing value for {}", flag))?
            .clone();
        match flag.as_str() {
            "--project" => flags.project = Some(value),
            "--experiment" => flags.experiment = Some(value),
            "--metric" => flags.metric = Some(value),
            "--scope" => flags.scope = Some(value.parse().map_err(|e: String| anyhow!(e))?),
            "--limit" => {
                flags.limit = Some(value.parse().map_err(|_| anyhow!("--limit expects a number"))?)
            }
            other => bail!("unknown flag {}", other),
        }
    }
    Ok(flags)
}

impl Flags {
    /// Translate to selection events, upstream first so repairs see the final project.
    fn events(&self, view: View) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(id) = &self.project {
            events.push(Event::SelectProject(id.clone()));
        }
        if let Some(id) = &self.experiment {
            if view == View::Runs {
                events.push(Event::FilterRunsByExperiment(id.clone()));
            } else {
                events.push(Event::SelectExperiment(id.clone()));
            }
        }
        if let Some(key) = &self.metric {
            events.push(Event::SelectMetric(key.clone()));
        }
        if let Some(scope) = self.scope {
            events.push(Event::SetScope(scope));
        }
        if let Some(limit) = self.limit {
            events.push(Event::SetLimit(limit));
        }
        events
    }
}

fn env_credential() -> Result<Credential> {
    let token = std::env::var("RUNATLAS_TOKEN").map_err(|_| anyhow!("RUNATLAS_TOKEN is not set"))?;
    let user_id = std::env::var("RUNATLAS_USER_ID").unwrap_or_default();
    let mut credential = Credential::bearer(user_id, token);
    credential.token_type = std::env::var("RUNATLAS_TOKEN_TYPE").ok();
    if !credential.is_usable() {
        bail!("RUNATLAS_TOKEN is empty");
    }
    Ok(credential)
}

async fn show(cfg: &Config, credential: Credential, view: View, flags: &Flags) -> Result<String> {
    let transport = Arc::new(HttpTransport::new(cfg)?);
    let mut runtime = SyncRuntime::new(transport, DashboardState::from_config(cfg));

    runtime.dispatch(Event::Show(view));
    runtime.dispatch(Event::SignedIn(credential));
    runtime.run_until_idle().await;

    let overrides = flags.events(view);
    if !overrides.is_empty() {
        for event in overrides {
            runtime.dispatch(event);
        }
        runtime.run_until_idle().await;
    }

    let state = runtime.state();
    if let Some(err) = state.error() {
        log(Level::Warn, Domain::System, "view.error", obj(&[("msg", v_str(err))]));
    }
    Ok(match view {
        View::Overview => render::render_overview(state),
        View::Leaderboard => render::render_leaderboard(state),
        View::Runs => render::render_runs(state),
        View::Imports => render::render_imports(state),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };
    let cfg = Config::from_env();
    let mut store = SqliteSessionStore::open(&cfg.session_path)?;

    match command.as_str() {
        "signin" => {
            let credential = env_credential()?;
            store.save(&credential)?;
            println!("signed in as {}", credential.user_id);
        }
        "signout" => {
            store.clear()?;
            println!("signed out");
        }
        "help" | "-h" | "--help" => print_usage(),
        name => {
            let Some(view) = View::parse(name) else {
                print_usage();
                bail!("unknown command {}", name);
            };
            let flags = parse_flags(&args[1..])?;
            let credential = store
                .load()?
                .ok_or_else(|| anyhow!("not signed in; run `runatlas signin` first"))?;
            log(
                Level::Info,
                Domain::System,
                "startup",
                obj(&[("view", v_str(view.as_str())), ("api", v_str(&cfg.api_base))]),
            );
            println!("{}", show(&cfg, credential, view, &flags).await?);
        }
    }
    Ok(())
}
