//! In-memory collaborators for tests and the CLI simulator.

use crate::profile::TrackingProfile;
use crate::store::ProfileStore;
use geotrack_traits::{AppliedConfig, ConfigSink, SwitchNotifier};
use std::sync::{Arc, Mutex};

/// Cloneable in-memory profile store. Clones share the same profile list, so
/// a test can hold one clone to edit profiles while the manager owns another.
/// Reads return enabled profiles sorted by priority descending (stable).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Vec<TrackingProfile>>>,
}

impl MemoryStore {
    pub fn new(profiles: Vec<TrackingProfile>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(profiles)),
        }
    }

    /// Replace the stored profile list. Callers still need to invalidate the
    /// manager's cache for the change to be observed.
    pub fn set_profiles(&self, profiles: Vec<TrackingProfile>) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = profiles;
        }
    }

    /// Remove one profile by id, as a UI "delete profile" would.
    pub fn remove(&self, id: i64) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.retain(|p| p.id != id);
        }
    }
}

impl ProfileStore for MemoryStore {
    fn enabled_profiles(
        &mut self,
    ) -> Result<Vec<TrackingProfile>, Box<dyn std::error::Error + Send + Sync>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("memory store poisoned"))?;
        let mut out = guard.clone();
        out.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(out)
    }
}

/// A store that always fails; exercises the fetch-failure path.
pub struct FailingStore;

impl ProfileStore for FailingStore {
    fn enabled_profiles(
        &mut self,
    ) -> Result<Vec<TrackingProfile>, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("store unavailable")))
    }
}

/// Records every configuration the manager applies.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    applied: Arc<Mutex<Vec<AppliedConfig>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<AppliedConfig> {
        self.applied.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<AppliedConfig> {
        self.applied
            .lock()
            .ok()
            .and_then(|g| g.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.applied.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigSink for RecordingSink {
    fn apply(
        &mut self,
        cfg: &AppliedConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut guard) = self.applied.lock() {
            guard.push(cfg.clone());
        }
        Ok(())
    }
}

/// Sink whose downstream is gone; every apply fails.
#[derive(Debug, Default)]
pub struct FailingSink;

impl ConfigSink for FailingSink {
    fn apply(
        &mut self,
        _cfg: &AppliedConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("collector unavailable")))
    }
}

/// Notifier that accepts every broadcast.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl SwitchNotifier for NullNotifier {
    fn notify_switch(
        &mut self,
        _profile_name: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Notifier with no live UI context; every broadcast fails.
#[derive(Debug, Default)]
pub struct DeadNotifier;

impl SwitchNotifier for DeadNotifier {
    fn notify_switch(
        &mut self,
        _profile_name: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("no ui context")))
    }
}
