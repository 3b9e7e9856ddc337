//! Pure condition evaluation: (profile, snapshot) -> match / no-match.

use crate::profile::{DeviceSnapshot, TrackingProfile};
use geotrack_config::{
    CONDITION_CAR_MODE, CONDITION_CHARGING, CONDITION_SPEED_ABOVE, CONDITION_SPEED_BELOW,
};

/// Parsed activation condition. Profiles whose condition string or threshold
/// cannot be parsed have no `Condition` and therefore never match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Charging,
    CarMode,
    SpeedAbove(f64),
    SpeedBelow(f64),
}

/// Parse a profile's condition. Returns `None` for unrecognized condition
/// names and for speed conditions with a missing or non-finite threshold.
pub fn parse(profile: &TrackingProfile) -> Option<Condition> {
    let threshold = || profile.speed_threshold_mps.filter(|t| t.is_finite());
    match profile.condition.as_str() {
        CONDITION_CHARGING => Some(Condition::Charging),
        CONDITION_CAR_MODE => Some(Condition::CarMode),
        CONDITION_SPEED_ABOVE => threshold().map(Condition::SpeedAbove),
        CONDITION_SPEED_BELOW => threshold().map(Condition::SpeedBelow),
        _ => None,
    }
}

/// True iff the profile's condition currently matches the snapshot.
/// Malformed profiles are a design-level no-match, never an error.
pub fn matches(profile: &TrackingProfile, snapshot: &DeviceSnapshot) -> bool {
    match parse(profile) {
        Some(Condition::Charging) => snapshot.is_charging,
        Some(Condition::CarMode) => snapshot.is_car_mode,
        Some(Condition::SpeedAbove(thr)) => {
            matches!(snapshot.average_speed_mps, Some(v) if v > thr)
        }
        Some(Condition::SpeedBelow(thr)) => {
            matches!(snapshot.average_speed_mps, Some(v) if v < thr)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn profile(condition: &str, threshold: Option<f64>) -> TrackingProfile {
        TrackingProfile {
            id: 1,
            name: "test".into(),
            interval_ms: 1_000,
            min_distance_m: 0.0,
            sync_interval_s: 60,
            priority: 0,
            condition: condition.into(),
            speed_threshold_mps: threshold,
            deactivation_delay_s: 0,
        }
    }

    fn snapshot(charging: bool, car: bool, speed: Option<f64>) -> DeviceSnapshot {
        DeviceSnapshot {
            is_charging: charging,
            is_car_mode: car,
            average_speed_mps: speed,
        }
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn charging_tracks_snapshot(#[case] charging: bool, #[case] expect: bool) {
        let p = profile("charging", None);
        assert_eq!(matches(&p, &snapshot(charging, false, None)), expect);
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn car_mode_tracks_snapshot(#[case] car: bool, #[case] expect: bool) {
        let p = profile("android_auto", None);
        assert_eq!(matches(&p, &snapshot(false, car, None)), expect);
    }

    #[rstest]
    #[case(Some(10.1), true)]
    #[case(Some(10.0), false)] // strictly greater
    #[case(Some(9.9), false)]
    #[case(None, false)] // no speed data never matches
    fn speed_above_is_strict(#[case] avg: Option<f64>, #[case] expect: bool) {
        let p = profile("speed_above", Some(10.0));
        assert_eq!(matches(&p, &snapshot(false, false, avg)), expect);
    }

    #[rstest]
    #[case(Some(1.9), true)]
    #[case(Some(2.0), false)] // strictly less
    #[case(Some(2.1), false)]
    #[case(None, false)]
    fn speed_below_is_strict(#[case] avg: Option<f64>, #[case] expect: bool) {
        let p = profile("speed_below", Some(2.0));
        assert_eq!(matches(&p, &snapshot(false, false, avg)), expect);
    }

    #[rstest]
    #[case("wifi_connected")]
    #[case("")]
    #[case("CHARGING")] // names are case-sensitive
    fn unknown_condition_never_matches(#[case] cond: &str) {
        let p = profile(cond, Some(1.0));
        let everything_on = snapshot(true, true, Some(100.0));
        assert!(!matches(&p, &everything_on));
    }

    #[test]
    fn speed_condition_without_threshold_never_matches() {
        let p = profile("speed_above", None);
        assert!(!matches(&p, &snapshot(false, false, Some(100.0))));
        assert_eq!(parse(&p), None);
    }

    #[test]
    fn non_finite_threshold_never_matches() {
        let p = profile("speed_below", Some(f64::NAN));
        assert!(!matches(&p, &snapshot(false, false, Some(1.0))));
    }
}
