//! autoblock - schedules start and stop times of the SelfControl blocker.
//!
//! `activate` installs a launchd daemon whose calendar triggers re-run this
//! binary (`run`) at every configured window start; each run decides from the
//! schedule whether a blocking session should begin and for how long, writes
//! SelfControl's preferences accordingly, and launches it.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use autoblock_app::config::{self, AppConfig};
use autoblock_app::{launchd, selfcontrol, system};
use autoblock_core::{plan_session, RunOutcome};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// autoblock - schedules start and stop times of SelfControl
#[derive(Parser, Debug)]
#[command(name = "autoblock", version, about)]
struct Args {
    /// Path to the configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Create the configuration file if needed and open it in an editor
    Config,
    /// Install the recurring trigger and start a session if one is due now
    Activate,
    /// Evaluate the schedule once (what the launchd trigger invokes)
    Run,
}

fn init_logging(args: &Args) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "autoblock_app={level},autoblock_core={level},warn",
            level = args.log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn config_path(args: &Args) -> anyhow::Result<PathBuf> {
    if let Some(path) = &args.config {
        return Ok(path.clone());
    }
    config::default_config_path().context("could not determine the user config directory")
}

/// `config`: make sure the file exists, then hand it to an editor.
fn cmd_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let local = Path::new("config.json");
        if local.exists() {
            std::fs::copy(local, path)?;
            tracing::info!("copied config.json from the current directory to {}", path.display());
        } else {
            std::fs::write(path, config::SAMPLE_CONFIG)?;
            tracing::info!("wrote sample configuration to {}", path.display());
        }
    }

    tracing::info!("opening {}", path.display());
    let status = match std::env::var("EDITOR") {
        Ok(editor) => Command::new(editor).arg(path).status()?,
        // Fall back to the OS default text editor.
        Err(_) => Command::new("open").arg("-t").arg(path).status()?,
    };
    if !status.success() {
        anyhow::bail!("editor exited with {status}");
    }
    Ok(())
}

/// `activate`: install the daemon, then do one run pass right away.
fn cmd_activate(path: &Path) -> anyhow::Result<()> {
    system::ensure_root()?;
    let config = AppConfig::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config.verify_username()?;

    tracing::info!("installing the schedule daemon");
    launchd::install(&config.policy.start_events())?;
    tracing::info!("installed");

    tracing::info!("starting SelfControl (this can take a few minutes)");
    run_once(&config)
}

/// `run`: one evaluation of the schedule against the current time.
fn cmd_run(path: &Path) -> anyhow::Result<()> {
    let config = AppConfig::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    run_once(&config)
}

fn run_once(config: &AppConfig) -> anyhow::Result<()> {
    let store = selfcontrol::PreferenceStore::new(config.username.clone());
    let now = Local::now().naive_local();

    match plan_session(&config.policy, now, store.is_block_running()) {
        RunOutcome::SkippedAlreadyRunning => {
            tracing::info!("SelfControl is already running; nothing to do");
        }
        RunOutcome::SkippedNoActiveSchedule => {
            tracing::info!("no schedule is active at the moment; shutting down");
        }
        RunOutcome::Started(plan) => {
            store.set_block_duration(plan.duration_minutes)?;
            tracing::info!("set BlockDuration to {}", plan.duration_minutes);

            store.set_block_as_whitelist(plan.block_as_whitelist)?;
            match &plan.host_blacklist {
                Some(hosts) => {
                    store.set_host_blacklist(hosts)?;
                    tracing::info!("set host blacklist ({} hosts)", hosts.len());
                }
                None => {
                    tracing::warn!("no host list configured; SelfControl keeps its own blacklist");
                }
            }

            if config.legacy_mode {
                // Older SelfControl versions expect the start date to be
                // written for them.
                store.set_block_started_now()?;
            }

            selfcontrol::start_block(&config.selfcontrol_path, &config.username)?;
            tracing::info!("SelfControl started for {} minute(s)", plan.duration_minutes);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let path = config_path(&args)?;
    match args.action {
        Action::Config => cmd_config(&path),
        Action::Activate => cmd_activate(&path),
        Action::Run => cmd_run(&path),
    }
}
