//! Tierscan - tiered enrichment scan orchestrator
//!
//! CLI entry point for the daemon and the one-shot operator commands.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::{info, warn};

use tierscan::backend::{Collaborators, HttpBackend, PriorityClassifier};
use tierscan::calendar::is_first_week_of_month;
use tierscan::cli::{Cli, Command, OutputFormat, get_log_path};
use tierscan::config::Config;
use tierscan::domain::{Mode, Tier};
use tierscan::scheduler::{LaunchOutcome, Orchestrator, SchedulerStatus};
use tierscan::triggers::{TriggerSet, run_monitor, run_triggers};

fn setup_logging(verbose: bool, stderr: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        // Write to log file, not stdout/stderr
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.stderr).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        backend = %config.backend.base_url,
        zone = %config.calendar.zone()?,
        "Tierscan loaded config"
    );

    match cli.command {
        Command::Run => cmd_run(&config).await,
        Command::Scan { tier, mode } => cmd_scan(&config, tier, mode).await,
        Command::Rank { top, format } => cmd_rank(&config, top, format).await,
        Command::CheckDay { date } => cmd_check_day(&config, date),
        Command::Status { format } => cmd_status(&config, format),
    }
}

/// Build the orchestrator against the configured HTTP backend
fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let backend = Arc::new(HttpBackend::from_config(&config.backend).context("Failed to create backend client")?);
    let gate = config.calendar.build_gate().context("Failed to build calendar")?;
    let zone = config.calendar.zone()?;

    Ok(Orchestrator::new(
        config.scheduler.clone(),
        Collaborators::from_backend(backend),
        gate,
        zone,
    ))
}

/// Run the trigger loop and the job monitor until a shutdown signal
async fn cmd_run(config: &Config) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(config)?);
    let rules = config.triggers.rules()?;
    let triggers = TriggerSet::new(rules, orchestrator.zone(), orchestrator.now_local());

    for (name, at) in triggers.upcoming() {
        println!("{:<20} next at {}", name, at.format("%a %Y-%m-%d %H:%M %:z"));
    }

    let (trigger_tx, trigger_rx) = tokio::sync::mpsc::channel::<()>(1);
    let (monitor_tx, monitor_rx) = tokio::sync::mpsc::channel::<()>(1);

    let trigger_handle = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            if let Err(e) = run_triggers(orchestrator, triggers, trigger_rx).await {
                tracing::error!(error = %e, "Trigger loop error");
            }
        }
    });
    let monitor_handle = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            if let Err(e) = run_monitor(orchestrator, monitor_rx).await {
                tracing::error!(error = %e, "Job monitor error");
            }
        }
    });

    info!("Orchestrator running. Press Ctrl+C to stop.");
    println!("Tierscan running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("Orchestrator shutting down...");
    let _ = trigger_tx.send(()).await;
    let _ = monitor_tx.send(()).await;
    let _ = trigger_handle.await;
    let _ = monitor_handle.await;

    // In-flight batches keep running in the backend but are no longer tracked
    let status = orchestrator.status().await;
    if status.active_job_count > 0 {
        warn!(active = status.active_job_count, "Exiting with untracked in-flight batches");
    }
    orchestrator.publish_status().await;

    Ok(())
}

/// Launch one tier scan and track it until it finishes.
///
/// State is memory-only, so a batch this process stops watching would never
/// be finalized or recalculated; Ctrl+C says so before exiting.
async fn cmd_scan(config: &Config, tier: Tier, mode: Option<Mode>) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let handle = match orchestrator.launch_tier_scan(tier, mode).await? {
        LaunchOutcome::NoCandidates { tier } => {
            println!("No {} candidates, nothing launched", tier);
            return Ok(());
        }
        LaunchOutcome::Launched(handle) => handle,
    };

    println!(
        "Launched {} scan: job {} ({} entities, {} mode, est. ${:.2}, ~{}m)",
        handle.tier,
        handle.job_id,
        handle.entity_count,
        handle.mode,
        handle.estimated_cost,
        handle.mode.estimate_duration(handle.entity_count).as_secs() / 60
    );
    println!("Waiting for {} to finish (Ctrl+C to stop waiting)...", handle.job_id);

    let finished = tokio::select! {
        finished = orchestrator.wait_for(&handle.job_id, config.scheduler.monitor_interval()) => finished,
        _ = tokio::signal::ctrl_c() => {
            warn!(job_id = %handle.job_id, "Stopped waiting; batch continues untracked");
            println!(
                "Stopped waiting. {} keeps running in the backend but will not be recorded or recalculated.",
                handle.job_id
            );
            return Ok(());
        }
    };
    let finished = finished.ok_or_else(|| eyre!("Job {} is no longer tracked", handle.job_id))?;

    let status = orchestrator.status().await;
    let stat = status
        .last_runs
        .get(&finished.tier)
        .filter(|stat| stat.job_id == finished.job_id)
        .ok_or_else(|| eyre!("Job {} finished but no run summary was recorded", finished.job_id))?;
    println!(
        "{} {}: {}/{} enriched, {} errors, {} fields updated in {}m",
        stat.job_id,
        stat.status,
        stat.enriched,
        stat.total,
        stat.errors,
        stat.fields_updated,
        stat.duration_secs / 60
    );

    Ok(())
}

/// Print the classifier's current tiers
async fn cmd_rank(config: &Config, top: usize, format: OutputFormat) -> Result<()> {
    let backend = HttpBackend::from_config(&config.backend).context("Failed to create backend client")?;
    let report = backend
        .calculate_all_priorities()
        .await
        .context("Failed to fetch priority ranking")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let today = config.calendar.zone()?.now().date_naive();
            for estimate in report.scan_estimates(is_first_week_of_month(today)) {
                println!(
                    "{:<8} {:>5} complexes  est. ${:.2} at {}",
                    estimate.tier, estimate.count, estimate.cost, estimate.mode
                );
            }
            println!();
            for (rank, entry) in report.top.iter().take(top).enumerate() {
                println!(
                    "{:>3}. {:>6.1}  #{:<8} {}",
                    rank + 1,
                    entry.score,
                    entry.id,
                    entry.name.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}

/// Print whether scheduled runs are allowed on a date
fn cmd_check_day(config: &Config, date: Option<chrono::NaiveDate>) -> Result<()> {
    let gate = config.calendar.build_gate()?;
    let date = match date {
        Some(date) => date,
        None => config.calendar.zone()?.now().date_naive(),
    };

    let decision = gate.should_skip_date(date);
    match decision.reason {
        Some(reason) if decision.skip => println!("{} ({}): skip - {}", date, date.format("%A"), reason),
        _ => println!("{} ({}): allowed", date, date.format("%A")),
    }
    Ok(())
}

/// Print the last snapshot written by the daemon
fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let path: PathBuf = config
        .scheduler
        .status_file
        .clone()
        .ok_or_else(|| eyre!("No status-file configured"))?;

    if !path.exists() {
        println!("No status snapshot at {} (is `tierscan run` active?)", path.display());
        return Ok(());
    }

    let status = SchedulerStatus::read_from(&path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => print!("{}", status.render_text()),
    }
    Ok(())
}
