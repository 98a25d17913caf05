//! Autosave policy for in-flight sessions.
//!
//! Pure decision logic: the caller owns the timer and invokes
//! `save_progress` when a checkpoint is due. Navigation to the next item
//! always checkpoints synchronously; the interval only governs the
//! background timer.

use chrono::{DateTime, Duration, Utc};

/// Fixed-interval autosave policy.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointPolicy {
    interval: Duration,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::seconds(30),
        }
    }
}

impl CheckpointPolicy {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Tracks one session's autosave state against a policy.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointTracker {
    policy: CheckpointPolicy,
    last_saved: Option<DateTime<Utc>>,
    paused: bool,
}

impl CheckpointTracker {
    #[must_use]
    pub fn new(policy: CheckpointPolicy) -> Self {
        Self {
            policy,
            last_saved: None,
            paused: false,
        }
    }

    /// Timer tick: true when an autosave is due. Never fires while paused
    /// or before the first answer exists.
    #[must_use]
    pub fn autosave_due(&self, now: DateTime<Utc>, answered: usize) -> bool {
        if self.paused || answered == 0 {
            return false;
        }
        match self.last_saved {
            None => true,
            Some(at) => now - at >= self.policy.interval,
        }
    }

    /// Navigation checkpoint: always save before advancing so progress is
    /// never lost between timer ticks, as long as there is anything to save.
    #[must_use]
    pub fn navigation_checkpoint(&self, answered: usize) -> bool {
        answered > 0
    }

    /// Suspend the timer; returns true when one final checkpoint should be
    /// taken before going quiet.
    pub fn pause(&mut self, answered: usize) -> bool {
        let was_paused = self.paused;
        self.paused = true;
        !was_paused && answered > 0
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Record that a checkpoint was persisted at `now`.
    pub fn mark_saved(&mut self, now: DateTime<Utc>) {
        self.last_saved = Some(now);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::time::fixed_now;

    fn tracker() -> CheckpointTracker {
        CheckpointTracker::new(CheckpointPolicy::default())
    }

    #[test]
    fn first_autosave_waits_for_an_answer() {
        let t = tracker();
        assert!(!t.autosave_due(fixed_now(), 0));
        assert!(t.autosave_due(fixed_now(), 1));
    }

    #[test]
    fn autosave_respects_the_interval() {
        let mut t = tracker();
        t.mark_saved(fixed_now());
        assert!(!t.autosave_due(fixed_now() + Duration::seconds(29), 3));
        assert!(t.autosave_due(fixed_now() + Duration::seconds(30), 3));
    }

    #[test]
    fn pausing_suspends_the_timer_and_takes_a_final_checkpoint() {
        let mut t = tracker();
        assert!(t.pause(2));
        assert!(!t.autosave_due(fixed_now() + Duration::minutes(10), 2));
        // Pausing twice does not double the final save.
        assert!(!t.pause(2));

        t.resume();
        assert!(t.autosave_due(fixed_now() + Duration::minutes(10), 2));
    }

    #[test]
    fn pausing_with_nothing_answered_saves_nothing() {
        let mut t = tracker();
        assert!(!t.pause(0));
    }

    #[test]
    fn navigation_always_checkpoints_once_answers_exist() {
        let t = tracker();
        assert!(!t.navigation_checkpoint(0));
        assert!(t.navigation_checkpoint(1));
    }
}
