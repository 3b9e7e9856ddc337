//! Trace format and deterministic replay.
//!
//! A trace is a JSON-lines file, one device event per line:
//!
//! ```text
//! {"event":"charging","on":true}
//! {"event":"location","lat":52.52,"lon":13.40,"speed_mps":14.2}
//! {"event":"car_mode","on":false}
//! {"event":"profiles_changed"}
//! {"event":"wait","ms":1500}
//! ```
//!
//! `wait` advances the manual clock instead of sleeping, so a trace covering
//! hours replays in milliseconds and deactivation deadlines fire at exactly
//! the recorded offsets.

use eyre::{Result, WrapErr};
use geotrack_core::ProfileManager;
use geotrack_traits::{AppliedConfig, ConfigSink, LocationFix, ManualClock};
use serde::Deserialize;
use std::io::BufRead;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Charging {
        on: bool,
    },
    CarMode {
        on: bool,
    },
    Location {
        lat: f64,
        lon: f64,
        #[serde(default)]
        speed_mps: Option<f64>,
    },
    ProfilesChanged,
    /// Advance simulated time without any device event.
    Wait {
        ms: u64,
    },
}

/// Sink that prints every applied configuration to stdout, one line per
/// switch, plain or as JSON depending on the global output mode.
#[derive(Debug, Clone, Copy)]
pub struct PrintSink {
    pub json: bool,
}

impl ConfigSink for PrintSink {
    fn apply(
        &mut self,
        cfg: &AppliedConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.json {
            let line = serde_json::json!({
                "switch": {
                    "profile": cfg.profile_name,
                    "profile_id": cfg.profile_id,
                    "interval_ms": cfg.interval_ms,
                    "distance_m": cfg.distance_m,
                    "sync_interval_s": cfg.sync_interval_s,
                }
            });
            println!("{line}");
        } else {
            println!(
                "switch -> {} (interval {} ms, distance {} m, sync {} s)",
                cfg.profile_name.as_deref().unwrap_or("<defaults>"),
                cfg.interval_ms,
                cfg.distance_m,
                cfg.sync_interval_s,
            );
        }
        Ok(())
    }
}

/// Parse one trace line; blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<TraceEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let ev = serde_json::from_str::<TraceEvent>(trimmed)?;
    Ok(Some(ev))
}

/// Feed one event into the manager; `wait` advances the clock and fires any
/// deadline that became due during the jump.
pub fn dispatch(manager: &mut ProfileManager, clock: &ManualClock, ev: TraceEvent) {
    match ev {
        TraceEvent::Charging { on } => manager.on_charging_state_changed(on),
        TraceEvent::CarMode { on } => manager.on_car_mode_state_changed(on),
        TraceEvent::Location { lat, lon, speed_mps } => {
            manager.on_location_update(&LocationFix {
                latitude: lat,
                longitude: lon,
                speed_mps,
            });
        }
        TraceEvent::ProfilesChanged => manager.invalidate_profiles(),
        TraceEvent::Wait { ms } => {
            clock.advance_ms(ms);
            if let Some(d) = manager.time_until_deactivation()
                && d.is_zero()
            {
                manager.on_deactivation_due();
            }
        }
    }
}

/// Replay a whole trace from a reader. Returns the number of events applied.
pub fn run<R: BufRead>(
    manager: &mut ProfileManager,
    clock: &ManualClock,
    reader: R,
) -> Result<usize> {
    let mut applied = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.wrap_err_with(|| format!("read trace line {}", idx + 1))?;
        let Some(ev) = parse_line(&line).wrap_err_with(|| format!("trace line {}", idx + 1))?
        else {
            continue;
        };
        dispatch(manager, clock, ev);
        applied += 1;
    }
    Ok(applied)
}
