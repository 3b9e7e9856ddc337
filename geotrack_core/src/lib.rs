#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Tracking profile scheduler (platform-agnostic).
//!
//! This crate decides which user-defined tracking profile should be in
//! effect and emits the resulting configuration through the
//! `geotrack_traits::ConfigSink` seam. Everything platform-specific —
//! profile persistence, the location bridge, UI notification rendering —
//! stays behind traits.
//!
//! ## Architecture
//!
//! - **Speed smoothing**: rolling mean over recent fixes (`speed` module)
//! - **Matching**: pure condition evaluation (`condition` module)
//! - **Selection**: first match in priority order (`resolve` module)
//! - **Debouncing**: cancellable deactivation deadline (`deactivation` module)
//! - **Orchestration**: `ProfileManager` owns the evaluate-and-apply cycle
//! - **Serialization**: bounded-channel event loop (`events` module)
//!
//! ## Error posture
//!
//! The public entry points never fail: store hiccups, sink rejections and
//! dead notifiers are logged and absorbed, degrading to "no match" /
//! "no-op" / "revert to defaults". Only construction is fallible.

pub mod condition;
pub mod deactivation;
pub mod error;
pub mod events;
pub mod mocks;
pub mod profile;
pub mod resolve;
pub mod speed;
pub mod store;

pub use events::DeviceEvent;
pub use profile::{DeviceSnapshot, TrackingProfile};
pub use speed::SpeedBuffer;
pub use store::ProfileStore;

use crate::deactivation::DeactivationScheduler;
use crate::error::{BuildError, Result};
use geotrack_traits::clock::{Clock, MonotonicClock};
use geotrack_traits::{AppliedConfig, ConfigSink, LocationFix, SwitchNotifier};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Defaults applied when no profile is active, plus buffer sizing.
///
/// The host may swap these at runtime via `ProfileManager::set_defaults`;
/// the change takes effect on the next evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerCfg {
    pub default_interval_ms: u64,
    pub default_distance_m: f64,
    pub default_sync_interval_s: u32,
    /// Rolling speed buffer capacity (samples).
    pub speed_window: usize,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            default_interval_ms: 60_000,
            default_distance_m: 10.0,
            default_sync_interval_s: 900,
            speed_window: 5,
        }
    }
}

impl From<&geotrack_config::Config> for SchedulerCfg {
    fn from(cfg: &geotrack_config::Config) -> Self {
        Self {
            default_interval_ms: cfg.defaults.interval_ms,
            default_distance_m: cfg.defaults.min_distance_m,
            default_sync_interval_s: cfg.defaults.sync_interval_s,
            speed_window: cfg.buffer.speed_window,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveProfile {
    id: i64,
    name: String,
}

/// Orchestrator: owns current state, runs the evaluate-and-apply cycle and
/// pushes configuration switches downstream.
///
/// Single-threaded by design; the host serializes entry calls (see
/// `events::run_loop`). All entry points are infallible.
pub struct ProfileManager {
    store: Box<dyn ProfileStore>,
    sink: Box<dyn ConfigSink>,
    notifier: Option<Box<dyn SwitchNotifier>>,
    cfg: SchedulerCfg,
    // Unified clock for deterministic time in tests
    clock: Arc<dyn Clock + Send + Sync>,
    // Epoch Instant for computing monotonic milliseconds
    epoch: Instant,

    speed: SpeedBuffer,
    is_charging: bool,
    is_car_mode: bool,

    // Cached enabled-profile list; re-read when dirty
    profiles: Vec<TrackingProfile>,
    profiles_dirty: bool,

    active: Option<ActiveProfile>,
    last_applied: Option<AppliedConfig>,
    deactivation: DeactivationScheduler,
}

impl core::fmt::Debug for ProfileManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProfileManager")
            .field("active", &self.active)
            .field("is_charging", &self.is_charging)
            .field("is_car_mode", &self.is_car_mode)
            .field("pending_deactivation", &self.deactivation.pending_profile())
            .finish()
    }
}

impl ProfileManager {
    /// Start building a ProfileManager.
    pub fn builder() -> ProfileManagerBuilder<Missing, Missing> {
        ProfileManagerBuilder::default()
    }

    /// Name of the currently active profile, or `None` when defaults apply.
    pub fn active_profile_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    /// Id of the currently active profile.
    pub fn active_profile_id(&self) -> Option<i64> {
        self.active.as_ref().map(|a| a.id)
    }

    /// The configuration last pushed through the sink, if any.
    pub fn last_applied(&self) -> Option<&AppliedConfig> {
        self.last_applied.as_ref()
    }

    /// Swap the default configuration. Buffer capacity is fixed at build
    /// time; only the default interval/distance/sync values are replaced.
    /// Takes effect on the next evaluation.
    pub fn set_defaults(&mut self, interval_ms: u64, distance_m: f64, sync_interval_s: u32) {
        self.cfg.default_interval_ms = interval_ms;
        self.cfg.default_distance_m = distance_m;
        self.cfg.default_sync_interval_s = sync_interval_s;
    }

    /// Time until the pending deactivation falls due; `None` when idle.
    /// Hosts use this as their wakeup timeout.
    pub fn time_until_deactivation(&self) -> Option<Duration> {
        let now_ms = self.clock.ms_since(self.epoch);
        self.deactivation
            .time_until_due_ms(now_ms)
            .map(Duration::from_millis)
    }

    /// Charging-state broadcast from the device bridge.
    pub fn on_charging_state_changed(&mut self, is_charging: bool) {
        self.is_charging = is_charging;
        self.evaluate();
    }

    /// Car-mode broadcast from the device bridge.
    pub fn on_car_mode_state_changed(&mut self, is_car_mode: bool) {
        self.is_car_mode = is_car_mode;
        self.evaluate();
    }

    /// A location fix arrived. Fixes without a usable speed reading are not
    /// buffered but still trigger an evaluation, so non-speed conditions
    /// stay responsive without motion data.
    pub fn on_location_update(&mut self, fix: &LocationFix) {
        if let Some(speed) = fix.speed_mps {
            self.speed.push(speed);
        }
        self.evaluate();
    }

    /// The profile list changed in the external store; drop the cache and
    /// re-evaluate against the fresh list.
    pub fn invalidate_profiles(&mut self) {
        self.profiles_dirty = true;
        self.evaluate();
    }

    /// Host callback once the deactivation deadline elapses.
    pub fn on_deactivation_due(&mut self) {
        self.evaluate();
    }

    /// Run one evaluate-and-apply cycle. Invoked from every entry point;
    /// safe to call directly at any time.
    pub fn evaluate(&mut self) {
        self.refresh_profiles();
        self.expire_overdue_deactivation();

        let snapshot = DeviceSnapshot {
            is_charging: self.is_charging,
            is_car_mode: self.is_car_mode,
            average_speed_mps: self.speed.average(),
        };
        let winner = resolve::pick_winner(&self.profiles, &snapshot).cloned();
        let now_ms = self.clock.ms_since(self.epoch);

        match (self.active.as_ref().map(|a| a.id), winner) {
            (Some(active_id), Some(w)) if w.id == active_id => {
                // Still winning: cancel any pending revert, re-apply only if
                // the profile's values were edited under us.
                if !self.deactivation.is_idle() {
                    tracing::debug!(profile_id = active_id, "re-matched; deactivation cancelled");
                    self.deactivation.cancel();
                }
                self.apply_if_changed(Some(&w));
            }
            (None, Some(w)) => {
                self.deactivation.cancel();
                self.apply_if_changed(Some(&w));
            }
            (Some(active_id), winner) => {
                // Switching away from the active profile.
                let outgoing = self.profiles.iter().find(|p| p.id == active_id);
                match outgoing {
                    None => {
                        // Disabled or deleted entirely: revert immediately,
                        // bypassing any deactivation delay.
                        tracing::info!(
                            profile_id = active_id,
                            "active profile removed from enabled list; immediate switch"
                        );
                        self.deactivation.cancel();
                        self.apply_if_changed(winner.as_ref());
                    }
                    Some(p) if p.deactivation_delay_ms() == 0 => {
                        self.deactivation.cancel();
                        self.apply_if_changed(winner.as_ref());
                    }
                    Some(p) => {
                        // The outgoing profile's delay governs the switch,
                        // even when a different profile is waiting to win.
                        // Keep an existing deadline; refreshing on every
                        // evaluation would push it out forever.
                        if self.deactivation.pending_profile() != Some(active_id) {
                            let delay_ms = p.deactivation_delay_ms();
                            self.deactivation.schedule(active_id, delay_ms, now_ms);
                            tracing::info!(
                                profile_id = active_id,
                                delay_ms,
                                "condition stopped matching; deactivation scheduled"
                            );
                        }
                    }
                }
            }
            (None, None) => {
                self.deactivation.cancel();
                self.apply_if_changed(None);
            }
        }
    }

    /// Re-read the enabled-profile list when invalidated. A failing store is
    /// logged and the last known list kept, so one bad read cannot flap the
    /// configuration.
    fn refresh_profiles(&mut self) {
        if !self.profiles_dirty {
            return;
        }
        match self.store.enabled_profiles() {
            Ok(list) => {
                self.profiles = list;
                self.profiles_dirty = false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "enabled-profile fetch failed; keeping last known list");
            }
        }
    }

    /// Apply the pending revert-to-defaults if its deadline has elapsed.
    fn expire_overdue_deactivation(&mut self) {
        let now_ms = self.clock.ms_since(self.epoch);
        let Some(profile_id) = self.deactivation.take_due(now_ms) else {
            return;
        };
        if self.active.as_ref().map(|a| a.id) == Some(profile_id) {
            tracing::info!(profile_id, "deactivation delay elapsed; reverting to defaults");
            self.active = None;
            let defaults = self.effective_config(None);
            self.push_applied(defaults);
        }
    }

    /// The configuration a given winner (or defaults) would apply.
    fn effective_config(&self, winner: Option<&TrackingProfile>) -> AppliedConfig {
        match winner {
            Some(p) => AppliedConfig {
                interval_ms: p.interval_ms,
                distance_m: p.min_distance_m,
                sync_interval_s: p.sync_interval_s,
                profile_id: Some(p.id),
                profile_name: Some(p.name.clone()),
            },
            None => AppliedConfig {
                interval_ms: self.cfg.default_interval_ms,
                distance_m: self.cfg.default_distance_m,
                sync_interval_s: self.cfg.default_sync_interval_s,
                profile_id: None,
                profile_name: None,
            },
        }
    }

    /// Switch to `winner` (or defaults) unless the effective configuration
    /// and profile identity are both unchanged since the last switch.
    fn apply_if_changed(&mut self, winner: Option<&TrackingProfile>) {
        let next = self.effective_config(winner);
        if self.last_applied.as_ref() == Some(&next) {
            return;
        }
        self.active = winner.map(|p| ActiveProfile {
            id: p.id,
            name: p.name.clone(),
        });
        self.push_applied(next);
    }

    /// Push a switch downstream. Internal state updates first; sink and
    /// notifier failures are logged and absorbed.
    fn push_applied(&mut self, cfg: AppliedConfig) {
        tracing::info!(
            interval_ms = cfg.interval_ms,
            distance_m = cfg.distance_m,
            sync_interval_s = cfg.sync_interval_s,
            profile = cfg.profile_name.as_deref().unwrap_or("<defaults>"),
            "tracking configuration switch"
        );
        self.last_applied = Some(cfg.clone());
        if let Err(e) = self.sink.apply(&cfg) {
            tracing::warn!(error = %e, "config sink rejected switch");
        }
        if let Some(notifier) = self.notifier.as_mut()
            && let Err(e) = notifier.notify_switch(cfg.profile_name.as_deref())
        {
            tracing::debug!(error = %e, "switch broadcast failed (no live UI context)");
        }
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for `ProfileManager`. Store and sink are mandatory and tracked in
/// the type state; everything else has defaults.
pub struct ProfileManagerBuilder<S, K> {
    store: Option<Box<dyn ProfileStore>>,
    sink: Option<Box<dyn ConfigSink>>,
    notifier: Option<Box<dyn SwitchNotifier>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    cfg: Option<SchedulerCfg>,
    _s: PhantomData<S>,
    _k: PhantomData<K>,
}

impl Default for ProfileManagerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            store: None,
            sink: None,
            notifier: None,
            clock: None,
            cfg: None,
            _s: PhantomData,
            _k: PhantomData,
        }
    }
}

impl<S, K> ProfileManagerBuilder<S, K> {
    /// Fallible build available in any type-state; returns a typed
    /// BuildError for missing pieces.
    pub fn try_build(self) -> Result<ProfileManager> {
        let ProfileManagerBuilder {
            store,
            sink,
            notifier,
            clock,
            cfg,
            _s: _,
            _k: _,
        } = self;

        let store = store.ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let sink = sink.ok_or_else(|| eyre::Report::new(BuildError::MissingSink))?;
        let cfg = cfg.unwrap_or_default();

        if cfg.default_interval_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "default_interval_ms must be >= 1",
            )));
        }
        if cfg.default_sync_interval_s == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "default_sync_interval_s must be >= 1",
            )));
        }
        if !cfg.default_distance_m.is_finite() || cfg.default_distance_m < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "default_distance_m must be finite and >= 0",
            )));
        }
        if cfg.speed_window == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "speed_window must be >= 1",
            )));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();
        let speed = SpeedBuffer::new(cfg.speed_window);

        Ok(ProfileManager {
            store,
            sink,
            notifier,
            cfg,
            clock,
            epoch,
            speed,
            is_charging: false,
            is_car_mode: false,
            profiles: Vec::new(),
            profiles_dirty: true,
            active: None,
            last_applied: None,
            deactivation: DeactivationScheduler::new(),
        })
    }

    /// Optional UI notifier; absence is a normal state.
    pub fn with_notifier(mut self, notifier: impl SwitchNotifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Provide a custom clock; defaults to MonotonicClock when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults and buffer sizing; validated on build.
    pub fn with_defaults(mut self, cfg: SchedulerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
}

// Setters that advance type-state when providing mandatory components
impl<K> ProfileManagerBuilder<Missing, K> {
    pub fn with_store(self, store: impl ProfileStore + 'static) -> ProfileManagerBuilder<Set, K> {
        let ProfileManagerBuilder {
            store: _,
            sink,
            notifier,
            clock,
            cfg,
            _s: _,
            _k: _,
        } = self;
        ProfileManagerBuilder {
            store: Some(Box::new(store)),
            sink,
            notifier,
            clock,
            cfg,
            _s: PhantomData,
            _k: PhantomData,
        }
    }
}

impl<S> ProfileManagerBuilder<S, Missing> {
    pub fn with_sink(self, sink: impl ConfigSink + 'static) -> ProfileManagerBuilder<S, Set> {
        let ProfileManagerBuilder {
            store,
            sink: _,
            notifier,
            clock,
            cfg,
            _s: _,
            _k: _,
        } = self;
        ProfileManagerBuilder {
            store,
            sink: Some(Box::new(sink)),
            notifier,
            clock,
            cfg,
            _s: PhantomData,
            _k: PhantomData,
        }
    }
}

impl ProfileManagerBuilder<Set, Set> {
    /// Validate and build. Only available once store and sink are set.
    pub fn build(self) -> Result<ProfileManager> {
        self.try_build()
    }
}
