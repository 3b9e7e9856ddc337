//! End-to-end manager behavior through the public entry points.

use geotrack_core::mocks::{DeadNotifier, FailingSink, FailingStore, MemoryStore, RecordingSink};
use geotrack_core::{ProfileManager, SchedulerCfg, TrackingProfile};
use geotrack_traits::LocationFix;
use rstest::rstest;

fn profile(id: i64, name: &str, priority: i32, condition: &str) -> TrackingProfile {
    TrackingProfile {
        id,
        name: name.into(),
        interval_ms: 5_000,
        min_distance_m: 5.0,
        sync_interval_s: 120,
        priority,
        condition: condition.into(),
        speed_threshold_mps: None,
        deactivation_delay_s: 0,
    }
}

fn manager_with(
    profiles: Vec<TrackingProfile>,
) -> (ProfileManager, MemoryStore, RecordingSink) {
    let store = MemoryStore::new(profiles);
    let sink = RecordingSink::new();
    let manager = ProfileManager::builder()
        .with_store(store.clone())
        .with_sink(sink.clone())
        .build()
        .expect("valid build");
    (manager, store, sink)
}

#[test]
fn build_rejects_zero_interval_defaults() {
    let cfg = SchedulerCfg {
        default_interval_ms: 0,
        ..SchedulerCfg::default()
    };
    let err = ProfileManager::builder()
        .with_store(MemoryStore::default())
        .with_sink(RecordingSink::new())
        .with_defaults(cfg)
        .build()
        .expect_err("zero interval must be rejected");
    assert!(err.to_string().contains("default_interval_ms"));
}

#[test]
fn build_rejects_zero_speed_window() {
    let cfg = SchedulerCfg {
        speed_window: 0,
        ..SchedulerCfg::default()
    };
    let err = ProfileManager::builder()
        .with_store(MemoryStore::default())
        .with_sink(RecordingSink::new())
        .with_defaults(cfg)
        .build()
        .expect_err("zero speed window must be rejected");
    assert!(err.to_string().contains("speed_window"));
}

#[test]
fn charging_activates_matching_profile() {
    let (mut manager, _store, sink) = manager_with(vec![profile(1, "plugged", 10, "charging")]);

    manager.on_charging_state_changed(true);

    assert_eq!(manager.active_profile_name(), Some("plugged"));
    let applied = sink.last().expect("one switch applied");
    assert_eq!(applied.profile_id, Some(1));
    assert_eq!(applied.interval_ms, 5_000);
}

#[test]
fn no_match_applies_defaults_once() {
    let (mut manager, _store, sink) = manager_with(vec![profile(1, "plugged", 10, "charging")]);

    manager.on_car_mode_state_changed(true);

    assert_eq!(manager.active_profile_name(), None);
    let applied = sink.last().expect("defaults applied");
    assert!(applied.is_default());
    assert_eq!(applied.interval_ms, 60_000);
    assert_eq!(applied.sync_interval_s, 900);
}

#[test]
fn higher_priority_profile_wins_among_matches() {
    let (mut manager, _store, sink) = manager_with(vec![
        profile(1, "low", 1, "charging"),
        profile(2, "high", 9, "charging"),
    ]);

    manager.on_charging_state_changed(true);

    assert_eq!(manager.active_profile_name(), Some("high"));
    assert_eq!(sink.last().and_then(|c| c.profile_id), Some(2));
}

#[rstest]
#[case(3)]
#[case(10)]
fn repeated_identical_state_applies_only_once(#[case] repeats: usize) {
    let (mut manager, _store, sink) = manager_with(vec![profile(1, "plugged", 10, "charging")]);

    for _ in 0..repeats {
        manager.on_charging_state_changed(true);
    }

    assert_eq!(sink.len(), 1, "unchanged winner must not re-apply");
}

#[test]
fn speed_profile_activates_on_smoothed_average_not_spike() {
    let mut fast = profile(1, "driving", 5, "speed_above");
    fast.speed_threshold_mps = Some(13.0);
    let (mut manager, _store, sink) = manager_with(vec![fast]);

    // Buffer: [5, 5, 5, 5, 20] -> mean 8.0, below threshold.
    for speed in [5.0, 5.0, 5.0, 5.0, 20.0] {
        manager.on_location_update(&LocationFix {
            latitude: 52.52,
            longitude: 13.40,
            speed_mps: Some(speed),
        });
    }
    assert_eq!(manager.active_profile_name(), None);

    // Sustained speed pushes the mean over the threshold.
    for _ in 0..5 {
        manager.on_location_update(&LocationFix {
            latitude: 52.52,
            longitude: 13.40,
            speed_mps: Some(20.0),
        });
    }
    assert_eq!(manager.active_profile_name(), Some("driving"));
    assert_eq!(sink.last().and_then(|c| c.profile_id), Some(1));
}

#[test]
fn fix_without_speed_still_evaluates_other_conditions() {
    let (mut manager, _store, sink) = manager_with(vec![profile(1, "plugged", 10, "charging")]);

    manager.on_charging_state_changed(true);
    assert_eq!(sink.len(), 1);

    manager.on_location_update(&LocationFix {
        latitude: 0.0,
        longitude: 0.0,
        speed_mps: None,
    });

    assert_eq!(manager.active_profile_name(), Some("plugged"));
    assert_eq!(sink.len(), 1, "speedless fix must not flap the config");
}

#[test]
fn editing_active_profile_reapplies_new_values_once() {
    let (mut manager, store, sink) = manager_with(vec![profile(1, "plugged", 10, "charging")]);

    manager.on_charging_state_changed(true);
    assert_eq!(sink.len(), 1);

    let mut edited = profile(1, "plugged", 10, "charging");
    edited.interval_ms = 1_000;
    store.set_profiles(vec![edited]);
    manager.invalidate_profiles();

    assert_eq!(manager.active_profile_name(), Some("plugged"));
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.last().map(|c| c.interval_ms), Some(1_000));
}

#[test]
fn removing_active_profile_reverts_immediately() {
    let mut sticky = profile(1, "plugged", 10, "charging");
    sticky.deactivation_delay_s = 300; // delay must NOT apply to removal
    let (mut manager, store, sink) = manager_with(vec![sticky]);

    manager.on_charging_state_changed(true);
    assert_eq!(manager.active_profile_name(), Some("plugged"));

    store.remove(1);
    manager.invalidate_profiles();

    assert_eq!(manager.active_profile_name(), None);
    assert!(sink.last().expect("defaults applied").is_default());
}

#[test]
fn removing_active_profile_falls_through_to_next_match() {
    let (mut manager, store, sink) = manager_with(vec![
        profile(1, "high", 9, "charging"),
        profile(2, "low", 1, "charging"),
    ]);

    manager.on_charging_state_changed(true);
    assert_eq!(manager.active_profile_name(), Some("high"));

    store.remove(1);
    manager.invalidate_profiles();

    assert_eq!(manager.active_profile_name(), Some("low"));
    assert_eq!(sink.last().and_then(|c| c.profile_id), Some(2));
}

#[test]
fn failing_store_degrades_to_defaults_without_panicking() {
    let sink = RecordingSink::new();
    let mut manager = ProfileManager::builder()
        .with_store(FailingStore)
        .with_sink(sink.clone())
        .build()
        .expect("valid build");

    manager.on_charging_state_changed(true);

    assert_eq!(manager.active_profile_name(), None);
    assert!(sink.last().expect("defaults applied").is_default());
}

/// Serves one good read, then fails every subsequent one.
struct FlakyStore {
    profiles: Vec<TrackingProfile>,
    reads: usize,
}

impl geotrack_core::ProfileStore for FlakyStore {
    fn enabled_profiles(
        &mut self,
    ) -> Result<Vec<TrackingProfile>, Box<dyn std::error::Error + Send + Sync>> {
        self.reads += 1;
        if self.reads == 1 {
            Ok(self.profiles.clone())
        } else {
            Err(Box::new(std::io::Error::other("store went away")))
        }
    }
}

#[test]
fn failing_store_keeps_last_known_profiles() {
    let sink = RecordingSink::new();
    let mut manager = ProfileManager::builder()
        .with_store(FlakyStore {
            profiles: vec![profile(1, "plugged", 10, "charging")],
            reads: 0,
        })
        .with_sink(sink.clone())
        .build()
        .expect("valid build");

    manager.on_charging_state_changed(true);
    assert_eq!(manager.active_profile_name(), Some("plugged"));

    // The store is now broken; invalidation logs the failure and keeps the
    // last known list, so the active profile survives the outage.
    manager.invalidate_profiles();
    assert_eq!(manager.active_profile_name(), Some("plugged"));
}

#[test]
fn dead_notifier_does_not_block_switches() {
    let store = MemoryStore::new(vec![profile(1, "plugged", 10, "charging")]);
    let sink = RecordingSink::new();
    let mut manager = ProfileManager::builder()
        .with_store(store)
        .with_sink(sink.clone())
        .with_notifier(DeadNotifier)
        .build()
        .expect("valid build");

    manager.on_charging_state_changed(true);

    assert_eq!(manager.active_profile_name(), Some("plugged"));
    assert_eq!(sink.len(), 1, "sink still receives the switch");
}

#[test]
fn failing_sink_does_not_block_state_updates() {
    let mut manager = ProfileManager::builder()
        .with_store(MemoryStore::new(vec![profile(1, "plugged", 10, "charging")]))
        .with_sink(FailingSink)
        .build()
        .expect("valid build");

    manager.on_charging_state_changed(true);

    // The sink rejected the switch, but the manager's view of the world
    // still moved: active profile and last-applied config are updated.
    assert_eq!(manager.active_profile_name(), Some("plugged"));
    let applied = manager.last_applied().expect("state updated despite sink error");
    assert_eq!(applied.profile_id, Some(1));
    assert_eq!(applied.interval_ms, 5_000);

    // And the diff guard still works off that state: no retry storm.
    manager.on_charging_state_changed(true);
    assert_eq!(manager.last_applied().map(|c| c.profile_id), Some(Some(1)));

    manager.on_charging_state_changed(false);
    assert_eq!(manager.active_profile_name(), None);
    assert!(manager.last_applied().expect("defaults recorded").is_default());
}

#[test]
fn set_defaults_takes_effect_on_next_evaluation() {
    let (mut manager, _store, sink) = manager_with(vec![]);

    manager.on_charging_state_changed(true);
    assert_eq!(sink.last().map(|c| c.interval_ms), Some(60_000));

    manager.set_defaults(30_000, 25.0, 600);
    manager.evaluate();

    let applied = sink.last().expect("new defaults applied");
    assert_eq!(applied.interval_ms, 30_000);
    assert_eq!(applied.sync_interval_s, 600);
}
