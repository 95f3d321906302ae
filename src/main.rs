//! TEIMOSA — Gap-Gated Draw Campaign Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! acquires the latest results, evaluates the gate, advances campaigns and
//! persists the store. Invoked once per scheduled run; there is no loop —
//! the scheduler is the loop.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use teimosa::campaign::store::CampaignStore;
use teimosa::campaign::LifecycleManager;
use teimosa::config::AppConfig;
use teimosa::events::{csv, EventLog};
use teimosa::fetch::{EventSource, FileSource, HttpSource};
use teimosa::gate::GateEngine;
use teimosa::report::{self, DailySignal, RunReport};
use teimosa::strategy::groups::QuadGroupStrategy;
use teimosa::strategy::payout::TieredPayoutModel;
use teimosa::strategy::Strategy;

const BANNER: &str = r#"
 _____ _____ ___ __  __  ___  ____    _
|_   _| ____|_ _|  \/  |/ _ \/ ___|  / \
  | | |  _|  | || |\/| | | | \___ \ / _ \
  | | | |___ | || |  | | |_| |___) / ___ \
  |_| |_____|___|_|  |_|\___/|____/_/   \_\

  Gap-Gated Draw Campaign Engine
  v0.1.0 — Daily Run
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        run_name = %cfg.run.name,
        state_path = %cfg.run.state_path.display(),
        gate_window = cfg.gate.window,
        campaign_window = cfg.campaign.window,
        "TEIMOSA starting up"
    );

    let report = run_once(&cfg).await?;

    info!(
        run_id = %report.run_id,
        latest_index = ?report.latest_index,
        gate_pass = report.gate_pass,
        opened = report.opened,
        active = report.active,
        won = report.won,
        expired = report.expired,
        notify = report.notify,
        "Run complete"
    );

    Ok(())
}

/// One full pass: events → gate → lifecycle → persistence → reporting.
///
/// The store is written exactly once, at the end — any failure before that
/// leaves the persisted state untouched and the next scheduled run retries
/// against the same store and a fresher event history.
async fn run_once(cfg: &AppConfig) -> Result<RunReport> {
    // -- Acquire events ----------------------------------------------------

    let log = acquire_events(cfg).await?;
    let latest = log.last().cloned();
    info!(
        events = log.len(),
        latest_index = ?log.max_index(),
        "Event history loaded"
    );

    // "Today" for snapshots and campaign identity: the latest event date
    // when available, otherwise the wall clock.
    let today = latest
        .as_ref()
        .map(|e| e.date)
        .unwrap_or_else(|| Utc::now().date_naive());

    // -- Components --------------------------------------------------------

    let strategy = QuadGroupStrategy::new(cfg.strategy.clone());
    let payout = TieredPayoutModel::new(cfg.payout.clone());
    let engine = GateEngine::new(cfg.gate.clone());
    let manager = LifecycleManager::new(cfg.campaign.clone());

    // -- Gate evaluation ---------------------------------------------------

    let gate_report = engine.evaluate(&log, &strategy, &payout)?;
    info!(summary = %gate_report.summary, decision = %gate_report.decision, "Walk-forward done");

    // Today's selection for the signal — frozen from the full history.
    let todays_selection = if let Some(last) = log.last() {
        strategy.generate(log.events(), last.index)?
    } else {
        Default::default()
    };

    // -- Campaign lifecycle ------------------------------------------------

    let mut store = CampaignStore::load(&cfg.run.state_path);

    let advance = manager.advance(&mut store, &log);
    let opened =
        manager.open_if_gate_passed(&gate_report.decision, &log, &strategy, &mut store, today)?;

    // Single write per run, after all mutations.
    store
        .save(&cfg.run.state_path)
        .context("Failed to persist campaign store")?;

    // -- Reporting ---------------------------------------------------------

    let signal = DailySignal {
        last_index: latest.as_ref().map(|e| e.index),
        last_date: latest.as_ref().map(|e| e.date),
        gate_pass: gate_report.decision.pass,
        gate: gate_report.decision.clone(),
        summary: gate_report.summary.clone(),
        selection: todays_selection,
    };
    report::write_snapshot(&cfg.run.snapshot_dir, &signal, today)?;

    let notify = report::should_notify(opened.as_ref(), &advance, &store);
    if notify {
        let digest = report::render_digest(&signal, &store, opened.as_ref(), &advance, today);
        report::write_digest(&cfg.run.digest_path, &digest)?;
    } else {
        info!("Nothing to report today — digest skipped");
    }

    let run_report = RunReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        date: today,
        latest_index: log.max_index(),
        gate_pass: gate_report.decision.pass,
        opened: opened.iter().count(),
        active: store.active().count(),
        won: advance.won.len(),
        expired: advance.expired.len(),
        notify,
    };
    report::write_run_report(&cfg.run.run_report_path, &run_report)?;

    Ok(run_report)
}

/// Download the results file when a URL is configured (caching it next to
/// the configured path), otherwise read the local file.
async fn acquire_events(cfg: &AppConfig) -> Result<EventLog> {
    let text = match &cfg.events.url {
        Some(url) => {
            let source = HttpSource::new(url.clone())?;
            match source.fetch().await {
                Ok(text) => {
                    if let Err(error) = std::fs::write(&cfg.events.path, &text) {
                        warn!(
                            path = %cfg.events.path.display(),
                            error = %error,
                            "Could not cache downloaded results"
                        );
                    }
                    text
                }
                Err(error) => {
                    warn!(error = %error, "Download failed, falling back to local results file");
                    FileSource::new(&cfg.events.path).fetch().await?
                }
            }
        }
        None => FileSource::new(&cfg.events.path).fetch().await?,
    };

    let events = csv::parse_events(&text);
    if events.is_empty() {
        anyhow::bail!(
            "No parseable draws in results data from {}",
            cfg.events.path.display()
        );
    }

    EventLog::from_events(events).map_err(Into::into)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("teimosa=info"));

    let json_logging = std::env::var("TEIMOSA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
