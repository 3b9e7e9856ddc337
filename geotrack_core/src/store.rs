//! Seam to the external profile store.

use crate::profile::TrackingProfile;

/// Read access to the enabled-profile list.
///
/// Implementations must return profiles sorted by priority descending, ties
/// broken by insertion order; the scheduler trusts this order and never
/// re-sorts. The manager caches the result and re-reads only after
/// `invalidate_profiles()`.
pub trait ProfileStore {
    fn enabled_profiles(
        &mut self,
    ) -> Result<Vec<TrackingProfile>, Box<dyn std::error::Error + Send + Sync>>;
}
