#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and profile import for the tracking scheduler.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Profile CSV loader enforces a strict header so bulk imports fail loudly
//!   rather than silently mis-mapping columns.
//!
//! Validation rejects structurally broken profiles (zero intervals,
//! duplicate ids, non-finite numbers). It deliberately accepts unknown
//! condition strings and speed conditions without a threshold: the scheduler
//! treats those as never-matching rather than as errors.

use serde::Deserialize;

/// Condition name: profile is active while the device is charging.
pub const CONDITION_CHARGING: &str = "charging";
/// Condition name: profile is active while the device is in car mode.
pub const CONDITION_CAR_MODE: &str = "android_auto";
/// Condition name: profile is active while average speed exceeds the threshold.
pub const CONDITION_SPEED_ABOVE: &str = "speed_above";
/// Condition name: profile is active while average speed is below the threshold.
pub const CONDITION_SPEED_BELOW: &str = "speed_below";

/// Tracking configuration applied when no profile matches.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DefaultsCfg {
    /// GPS sampling interval in milliseconds.
    pub interval_ms: u64,
    /// Minimum movement between recorded fixes, in meters.
    pub min_distance_m: f64,
    /// Upload/sync cadence in seconds.
    pub sync_interval_s: u32,
}

impl Default for DefaultsCfg {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            min_distance_m: 10.0,
            sync_interval_s: 900,
        }
    }
}

/// Rolling speed buffer sizing.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct BufferCfg {
    /// Number of recent speed samples averaged for speed conditions.
    pub speed_window: usize,
}

impl Default for BufferCfg {
    fn default() -> Self {
        Self { speed_window: 5 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// One user-defined tracking profile.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProfileCfg {
    pub id: i64,
    pub name: String,
    pub interval_ms: u64,
    pub min_distance_m: f64,
    pub sync_interval_s: u32,
    /// Higher wins among simultaneously matching profiles.
    pub priority: i32,
    /// Activation condition name. Unrecognized values are kept and simply
    /// never match at runtime.
    pub condition: String,
    /// Required for the speed conditions, in meters per second.
    #[serde(default)]
    pub speed_threshold_mps: Option<f64>,
    /// Grace period before reverting to defaults once the condition stops
    /// matching. 0 means switch away immediately.
    #[serde(default)]
    pub deactivation_delay_s: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsCfg,
    pub buffer: BufferCfg,
    pub logging: Logging,
    #[serde(rename = "profile")]
    pub profiles: Vec<ProfileCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Parse and validate in one step.
pub fn load_config(s: &str) -> eyre::Result<Config> {
    let cfg = load_toml(s).map_err(|e| eyre::eyre!("parse config TOML: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.defaults.interval_ms == 0 {
            eyre::bail!("defaults.interval_ms must be >= 1");
        }
        if self.defaults.sync_interval_s == 0 {
            eyre::bail!("defaults.sync_interval_s must be >= 1");
        }
        if !self.defaults.min_distance_m.is_finite() || self.defaults.min_distance_m < 0.0 {
            eyre::bail!("defaults.min_distance_m must be finite and >= 0");
        }
        if self.buffer.speed_window == 0 {
            eyre::bail!("buffer.speed_window must be >= 1");
        }

        let mut seen = std::collections::HashSet::new();
        for p in &self.profiles {
            if !seen.insert(p.id) {
                eyre::bail!("duplicate profile id {}", p.id);
            }
            validate_profile(p)?;
        }
        Ok(())
    }

    /// Enabled profiles sorted by priority descending. The sort is stable, so
    /// list order breaks ties deterministically.
    pub fn enabled_profiles(&self) -> Vec<ProfileCfg> {
        let mut out: Vec<ProfileCfg> = self.profiles.iter().filter(|p| p.enabled).cloned().collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority));
        out
    }
}

fn validate_profile(p: &ProfileCfg) -> eyre::Result<()> {
    if p.name.trim().is_empty() {
        eyre::bail!("profile {} has an empty name", p.id);
    }
    if p.interval_ms == 0 {
        eyre::bail!("profile {:?}: interval_ms must be >= 1", p.name);
    }
    if p.sync_interval_s == 0 {
        eyre::bail!("profile {:?}: sync_interval_s must be >= 1", p.name);
    }
    if !p.min_distance_m.is_finite() || p.min_distance_m < 0.0 {
        eyre::bail!("profile {:?}: min_distance_m must be finite and >= 0", p.name);
    }
    if let Some(thr) = p.speed_threshold_mps
        && !thr.is_finite()
    {
        eyre::bail!("profile {:?}: speed_threshold_mps must be finite", p.name);
    }
    if p.deactivation_delay_s > 24 * 60 * 60 {
        eyre::bail!(
            "profile {:?}: deactivation_delay_s is unreasonably large (>24h)",
            p.name
        );
    }
    Ok(())
}

/// Expected header row for profile CSV imports.
pub const PROFILE_CSV_HEADERS: [&str; 10] = [
    "id",
    "name",
    "interval_ms",
    "min_distance_m",
    "sync_interval_s",
    "priority",
    "condition",
    "speed_threshold_mps",
    "deactivation_delay_s",
    "enabled",
];

/// Load profiles from CSV with a strict header check. Empty
/// `speed_threshold_mps` cells become `None`.
pub fn load_profiles_csv(path: &std::path::Path) -> eyre::Result<Vec<ProfileCfg>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open profile CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != PROFILE_CSV_HEADERS {
        eyre::bail!(
            "profile CSV must have headers '{}', got: {}",
            PROFILE_CSV_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProfileCfg>().enumerate() {
        match rec {
            Ok(p) => {
                validate_profile(&p)?;
                out.push(p);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(out)
}
