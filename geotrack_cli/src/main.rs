//! geotrack: tracking profile scheduler CLI.
//!
//! Thin shell over `geotrack_core`: loads and validates the config, wires a
//! stdout sink into the scheduler and drives it from a recorded trace
//! (`replay`), live stdin events (`follow`), or not at all (`self-check`,
//! `profiles`).

mod cli;
mod error_fmt;
mod live;
mod replay;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD};
use eyre::{Result, WrapErr};
use geotrack_config::Config;
use geotrack_core::mocks::MemoryStore;
use geotrack_core::{ProfileManager, SchedulerCfg, TrackingProfile};
use geotrack_traits::ManualClock;
use replay::PrintSink;
use std::fs;
use std::io::BufReader;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn main() -> ExitCode {
    let _ = color_eyre::install();
    let args = Cli::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if args.json {
                eprintln!("{}", error_fmt::json_error(&e));
            } else {
                eprintln!("{}", error_fmt::humanize(&e));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<()> {
    let cfg = load_config(args)?;
    init_tracing(args, &cfg.logging)?;

    match &args.cmd {
        Commands::SelfCheck => self_check(args, &cfg),
        Commands::Profiles => list_profiles(args, &cfg),
        Commands::Replay { trace } => {
            let (mut manager, clock) = build_replay_manager(args, &cfg)?;
            let file = fs::File::open(trace)
                .wrap_err_with(|| format!("open trace file {}", trace.display()))?;
            let n = replay::run(&mut manager, &clock, BufReader::new(file))?;
            if !args.json {
                println!(
                    "replayed {n} events; active profile: {}",
                    manager.active_profile_name().unwrap_or("<defaults>")
                );
            }
            Ok(())
        }
        Commands::Follow => {
            let mut manager = ProfileManager::builder()
                .with_store(MemoryStore::new(scheduler_profiles(&cfg)))
                .with_sink(PrintSink { json: args.json })
                .with_defaults(SchedulerCfg::from(&cfg))
                .build()?;
            live::run(&mut manager)
        }
    }
}

/// Load the TOML config, merge an optional CSV import, validate the result.
fn load_config(args: &Cli) -> Result<Config> {
    let text = fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("read config file {}", args.config.display()))?;
    let mut cfg = geotrack_config::load_config(&text)?;

    if let Some(csv) = &args.profiles_csv {
        let imported = geotrack_config::load_profiles_csv(csv)?;
        cfg.profiles.extend(imported);
        // Re-validate so an id collision between TOML and CSV fails loudly.
        cfg.validate()?;
    }
    Ok(cfg)
}

/// Enabled profiles in evaluation order, as the scheduler sees them.
fn scheduler_profiles(cfg: &Config) -> Vec<TrackingProfile> {
    cfg.enabled_profiles().iter().map(TrackingProfile::from).collect()
}

fn build_replay_manager(args: &Cli, cfg: &Config) -> Result<(ProfileManager, ManualClock)> {
    let clock = ManualClock::new();
    let manager = ProfileManager::builder()
        .with_store(MemoryStore::new(scheduler_profiles(cfg)))
        .with_sink(PrintSink { json: args.json })
        .with_clock(Box::new(clock.clone()))
        .with_defaults(SchedulerCfg::from(cfg))
        .build()?;
    Ok((manager, clock))
}

fn self_check(args: &Cli, cfg: &Config) -> Result<()> {
    let enabled = cfg.enabled_profiles().len();

    // Prove the config yields a buildable scheduler and survives one cycle.
    let mut manager = ProfileManager::builder()
        .with_store(MemoryStore::new(scheduler_profiles(cfg)))
        .with_sink(geotrack_core::mocks::RecordingSink::new())
        .with_defaults(SchedulerCfg::from(cfg))
        .build()?;
    manager.evaluate();

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "self_check": "ok",
                "profiles": cfg.profiles.len(),
                "enabled": enabled,
            })
        );
    } else {
        println!(
            "config ok: {} profiles ({} enabled)",
            cfg.profiles.len(),
            enabled
        );
    }
    Ok(())
}

fn list_profiles(args: &Cli, cfg: &Config) -> Result<()> {
    let enabled = cfg.enabled_profiles();
    if args.json {
        let rows: Vec<serde_json::Value> = enabled
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "name": p.name,
                    "priority": p.priority,
                    "condition": p.condition,
                    "speed_threshold_mps": p.speed_threshold_mps,
                    "interval_ms": p.interval_ms,
                    "deactivation_delay_s": p.deactivation_delay_s,
                })
            })
            .collect();
        println!("{}", serde_json::json!({ "profiles": rows }));
        return Ok(());
    }

    if enabled.is_empty() {
        println!("no enabled profiles; defaults always apply");
        return Ok(());
    }
    for (rank, p) in enabled.iter().enumerate() {
        let threshold = p
            .speed_threshold_mps
            .map(|t| format!(" {t} m/s"))
            .unwrap_or_default();
        println!(
            "{}. {} (priority {}, condition {}{}, interval {} ms, delay {} s)",
            rank + 1,
            p.name,
            p.priority,
            p.condition,
            threshold,
            p.interval_ms,
            p.deactivation_delay_s,
        );
    }
    Ok(())
}

/// Console logging per CLI flags, plus an optional JSONL file from the
/// `[logging]` config section. RUST_LOG overrides --log-level when set.
fn init_tracing(args: &Cli, logging: &geotrack_config::Logging) -> Result<()> {
    let level = logging.level.as_deref().unwrap_or(&args.log_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if args.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match &logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref() {
                None | Some("never") => tracing_appender::rolling::never(dir, name),
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                Some(other) => eyre::bail!("unknown logging.rotation {other:?}"),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}
