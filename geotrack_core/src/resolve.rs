//! Priority resolution among simultaneously matching profiles.

use crate::condition;
use crate::profile::{DeviceSnapshot, TrackingProfile};

/// Return the first matching profile in the given list, or `None`.
///
/// The enabled-profile list arrives pre-sorted by priority descending with
/// ties broken by list order, so "first match" is the deterministic winner.
/// The resolver never re-sorts.
pub fn pick_winner<'a>(
    profiles: &'a [TrackingProfile],
    snapshot: &DeviceSnapshot,
) -> Option<&'a TrackingProfile> {
    profiles.iter().find(|p| condition::matches(p, snapshot))
}

#[cfg(test)]
mod tests {
    use super::pick_winner;
    use crate::profile::{DeviceSnapshot, TrackingProfile};

    fn profile(id: i64, condition: &str) -> TrackingProfile {
        TrackingProfile {
            id,
            name: format!("p{id}"),
            interval_ms: 1_000,
            min_distance_m: 0.0,
            sync_interval_s: 60,
            priority: 0,
            condition: condition.into(),
            speed_threshold_mps: None,
            deactivation_delay_s: 0,
        }
    }

    #[test]
    fn no_profiles_no_winner() {
        let snap = DeviceSnapshot {
            is_charging: true,
            ..Default::default()
        };
        assert!(pick_winner(&[], &snap).is_none());
    }

    #[test]
    fn first_matching_profile_wins() {
        let profiles = vec![
            profile(1, "android_auto"), // does not match
            profile(2, "charging"),     // first match
            profile(3, "charging"),     // also matches, but later in order
        ];
        let snap = DeviceSnapshot {
            is_charging: true,
            ..Default::default()
        };
        let winner = pick_winner(&profiles, &snap).expect("a profile matches");
        assert_eq!(winner.id, 2);
    }

    #[test]
    fn nothing_matches_yields_none() {
        let profiles = vec![profile(1, "charging"), profile(2, "android_auto")];
        let snap = DeviceSnapshot::default();
        assert!(pick_winner(&profiles, &snap).is_none());
    }

    #[test]
    fn malformed_profiles_are_skipped_not_fatal() {
        let mut bad = profile(1, "speed_above");
        bad.speed_threshold_mps = None;
        let profiles = vec![bad, profile(2, "charging")];
        let snap = DeviceSnapshot {
            is_charging: true,
            average_speed_mps: Some(50.0),
            ..Default::default()
        };
        assert_eq!(pick_winner(&profiles, &snap).map(|p| p.id), Some(2));
    }
}
