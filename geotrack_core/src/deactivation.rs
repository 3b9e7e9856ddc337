//! Deactivation deadline state machine.
//!
//! Two states: idle (no pending deadline) and pending (one deadline tied to
//! a specific profile id). The deadline is plain data driven by the injected
//! clock; the host turns it into a wakeup. Because this struct owns the only
//! timer state, cancelling guarantees the deadline can never fire later.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    profile_id: i64,
    due_at_ms: u64,
}

/// At most one pending deactivation; scheduling replaces any prior one.
#[derive(Debug, Default)]
pub struct DeactivationScheduler {
    pending: Option<Pending>,
}

impl DeactivationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Profile id the pending deadline was scheduled for, if any.
    pub fn pending_profile(&self) -> Option<i64> {
        self.pending.map(|p| p.profile_id)
    }

    /// Schedule a deadline for `profile_id`, cancelling any prior one.
    pub fn schedule(&mut self, profile_id: i64, delay_ms: u64, now_ms: u64) {
        self.pending = Some(Pending {
            profile_id,
            due_at_ms: now_ms.saturating_add(delay_ms),
        });
    }

    /// Cancel any pending deadline and return to idle.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// If the pending deadline has elapsed, clear it and return its profile
    /// id; otherwise leave the state untouched.
    pub fn take_due(&mut self, now_ms: u64) -> Option<i64> {
        match self.pending {
            Some(p) if now_ms >= p.due_at_ms => {
                self.pending = None;
                Some(p.profile_id)
            }
            _ => None,
        }
    }

    /// Milliseconds until the pending deadline, if one exists. Returns 0 when
    /// already overdue.
    pub fn time_until_due_ms(&self, now_ms: u64) -> Option<u64> {
        self.pending.map(|p| p.due_at_ms.saturating_sub(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::DeactivationScheduler;

    #[test]
    fn starts_idle() {
        let mut sched = DeactivationScheduler::new();
        assert!(sched.is_idle());
        assert_eq!(sched.take_due(u64::MAX), None);
        assert_eq!(sched.time_until_due_ms(0), None);
    }

    #[test]
    fn fires_only_once_deadline_elapses() {
        let mut sched = DeactivationScheduler::new();
        sched.schedule(7, 1_000, 100);
        assert_eq!(sched.pending_profile(), Some(7));
        assert_eq!(sched.take_due(1_099), None, "one ms early: still pending");
        assert_eq!(sched.take_due(1_100), Some(7));
        assert!(sched.is_idle(), "firing clears the state");
        assert_eq!(sched.take_due(5_000), None, "never fires twice");
    }

    #[test]
    fn cancel_prevents_any_later_fire() {
        let mut sched = DeactivationScheduler::new();
        sched.schedule(3, 50, 0);
        sched.cancel();
        assert_eq!(sched.take_due(u64::MAX), None);
    }

    #[test]
    fn rescheduling_replaces_prior_deadline() {
        let mut sched = DeactivationScheduler::new();
        sched.schedule(1, 100, 0);
        sched.schedule(2, 500, 0);
        // Profile 1's deadline no longer exists.
        assert_eq!(sched.take_due(200), None);
        assert_eq!(sched.take_due(500), Some(2));
    }

    #[test]
    fn time_until_due_counts_down_and_floors_at_zero() {
        let mut sched = DeactivationScheduler::new();
        sched.schedule(1, 300, 1_000);
        assert_eq!(sched.time_until_due_ms(1_000), Some(300));
        assert_eq!(sched.time_until_due_ms(1_250), Some(50));
        assert_eq!(sched.time_until_due_ms(2_000), Some(0));
    }

    #[test]
    fn zero_delay_is_due_immediately() {
        let mut sched = DeactivationScheduler::new();
        sched.schedule(9, 0, 42);
        assert_eq!(sched.take_due(42), Some(9));
    }
}
