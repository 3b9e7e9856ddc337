//! Live mode: stdin JSON events scheduled against the real clock.
//!
//! A reader thread parses stdin lines into device events and feeds a bounded
//! channel; the manager runs on the main thread via the core event loop, so
//! deactivation deadlines fire in real time even while stdin is quiet.
//! Ctrl-C injects a shutdown event through the same channel.

use crate::replay::TraceEvent;
use crossbeam_channel as xch;
use eyre::{Result, WrapErr};
use geotrack_core::{DeviceEvent, ProfileManager, events};
use geotrack_traits::LocationFix;
use std::io::BufRead;
use std::thread;

fn to_device_event(ev: TraceEvent) -> Option<DeviceEvent> {
    match ev {
        TraceEvent::Charging { on } => Some(DeviceEvent::Charging(on)),
        TraceEvent::CarMode { on } => Some(DeviceEvent::CarMode(on)),
        TraceEvent::Location { lat, lon, speed_mps } => Some(DeviceEvent::Location(LocationFix {
            latitude: lat,
            longitude: lon,
            speed_mps,
        })),
        TraceEvent::ProfilesChanged => Some(DeviceEvent::ProfilesChanged),
        // Waits are a replay construct; live mode gets its timing for free.
        TraceEvent::Wait { .. } => None,
    }
}

pub fn run(manager: &mut ProfileManager) -> Result<()> {
    let (tx, rx) = xch::bounded::<DeviceEvent>(64);

    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        // A full channel here means shutdown is already queued behind other
        // events; dropping the signal is fine.
        let _ = ctrlc_tx.try_send(DeviceEvent::Shutdown);
    })
    .wrap_err("install Ctrl-C handler")?;

    let reader = thread::spawn(move || {
        let stdin = std::io::stdin();
        for (idx, line) in stdin.lock().lines().enumerate() {
            let Ok(line) = line else { break };
            match crate::replay::parse_line(&line) {
                Ok(Some(ev)) => {
                    if let Some(dev) = to_device_event(ev)
                        && tx.send(dev).is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "skipping malformed event");
                }
            }
        }
        // stdin EOF ends the session, so piped input terminates cleanly.
        let _ = tx.send(DeviceEvent::Shutdown);
    });

    events::run_loop(manager, &rx);
    drop(rx);
    let _ = reader.join();
    Ok(())
}
