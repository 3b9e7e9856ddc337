pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// A single location fix as delivered by the platform location bridge.
///
/// The scheduler only inspects `speed_mps`; position fields ride along for
/// consumers that log or display fixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Ground speed in meters per second, when the platform reported one.
    /// `None` means "no speed available", not zero.
    pub speed_mps: Option<f64>,
}

/// The tracking configuration most recently pushed to the GPS collector.
///
/// `profile_id`/`profile_name` are both `None` when defaults are in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedConfig {
    pub interval_ms: u64,
    pub distance_m: f64,
    pub sync_interval_s: u32,
    pub profile_id: Option<i64>,
    pub profile_name: Option<String>,
}

impl AppliedConfig {
    /// True when no profile is active and defaults are applied.
    pub fn is_default(&self) -> bool {
        self.profile_id.is_none()
    }
}

/// Consumer of effective tracking configurations (the GPS-collection
/// subsystem). Invoked once per configuration switch.
pub trait ConfigSink {
    fn apply(
        &mut self,
        cfg: &AppliedConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Best-effort broadcast of a profile switch to UI consumers. A dead or
/// absent UI context is a normal state; failures are never fatal.
pub trait SwitchNotifier {
    fn notify_switch(
        &mut self,
        profile_name: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
