//! Profile and device-state value types used by the scheduler.

/// A user-defined tracking profile as seen by the scheduler.
///
/// Profiles are immutable value objects from the scheduler's perspective:
/// the core compares and selects them, never mutates or persists them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingProfile {
    pub id: i64,
    pub name: String,
    /// GPS sampling interval applied while this profile is active.
    pub interval_ms: u64,
    /// Minimum movement between recorded fixes, in meters.
    pub min_distance_m: f64,
    /// Upload/sync cadence in seconds.
    pub sync_interval_s: u32,
    /// Higher wins among simultaneously matching profiles.
    pub priority: i32,
    /// Raw activation condition name; unrecognized values never match.
    pub condition: String,
    /// Threshold for the speed conditions, meters per second.
    pub speed_threshold_mps: Option<f64>,
    /// Grace period before reverting to defaults once the condition stops
    /// matching.
    pub deactivation_delay_s: u64,
}

impl TrackingProfile {
    pub fn deactivation_delay_ms(&self) -> u64 {
        self.deactivation_delay_s.saturating_mul(1_000)
    }
}

impl From<&geotrack_config::ProfileCfg> for TrackingProfile {
    fn from(p: &geotrack_config::ProfileCfg) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            interval_ms: p.interval_ms,
            min_distance_m: p.min_distance_m,
            sync_interval_s: p.sync_interval_s,
            priority: p.priority,
            condition: p.condition.clone(),
            speed_threshold_mps: p.speed_threshold_mps,
            deactivation_delay_s: p.deactivation_delay_s,
        }
    }
}

/// Transient device-state snapshot, rebuilt for every evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub is_charging: bool,
    pub is_car_mode: bool,
    /// Mean of the rolling speed buffer; `None` when no valid sample exists.
    pub average_speed_mps: Option<f64>,
}
