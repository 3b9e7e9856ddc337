//! Single-threaded event loop serializing device events onto one manager.
//!
//! Charging broadcasts, car-mode broadcasts, location fixes and profile-list
//! edits arrive from independent producers; a bounded channel funnels them
//! into one consumer thread so the manager never sees concurrent entry
//! calls. The pending deactivation deadline becomes the receive timeout, so
//! a quiet channel still wakes up exactly when a revert falls due.

use crate::ProfileManager;
use crossbeam_channel as xch;
use geotrack_traits::LocationFix;

/// An input event for the scheduler, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Charging(bool),
    CarMode(bool),
    Location(LocationFix),
    /// The profile list changed in the external store.
    ProfilesChanged,
    /// Stop the event loop.
    Shutdown,
}

/// Drain events until `Shutdown` or all senders disconnect.
pub fn run_loop(manager: &mut ProfileManager, rx: &xch::Receiver<DeviceEvent>) {
    loop {
        let received = match manager.time_until_deactivation() {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(ev) => Some(ev),
                Err(xch::RecvTimeoutError::Timeout) => None,
                Err(xch::RecvTimeoutError::Disconnected) => {
                    tracing::debug!("event producers disconnected; stopping");
                    return;
                }
            },
            None => match rx.recv() {
                Ok(ev) => Some(ev),
                Err(_) => {
                    tracing::debug!("event producers disconnected; stopping");
                    return;
                }
            },
        };

        match received {
            Some(DeviceEvent::Charging(on)) => manager.on_charging_state_changed(on),
            Some(DeviceEvent::CarMode(on)) => manager.on_car_mode_state_changed(on),
            Some(DeviceEvent::Location(fix)) => manager.on_location_update(&fix),
            Some(DeviceEvent::ProfilesChanged) => manager.invalidate_profiles(),
            Some(DeviceEvent::Shutdown) => {
                tracing::debug!("event loop shutdown requested");
                return;
            }
            None => manager.on_deactivation_due(),
        }
    }
}
