use core::time::Duration;

use log::warn;

/// One-shot timer scheduler consumed by the sequencer.
///
/// Implementations arrange for the owner to call
/// [`ButtonEventSimulator::on_timer_expired`](super::ButtonEventSimulator::on_timer_expired)
/// once `duration` has elapsed, on the same task that drives the sequencer.
pub trait TimerService {
    /// Schedules a single expiry after `duration`.
    fn start_timer(&mut self, duration: Duration);
}

impl<T> TimerService for &mut T
where
    T: TimerService + ?Sized,
{
    fn start_timer(&mut self, duration: Duration) {
        (**self).start_timer(duration);
    }
}

/// Single-slot timer that remembers the armed duration until the driver
/// takes it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OneShotTimer {
    armed: Option<Duration>,
}

impl OneShotTimer {
    /// Creates a disarmed timer.
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Returns and clears the pending duration.
    pub fn take(&mut self) -> Option<Duration> {
        self.armed.take()
    }

    /// Pending duration without clearing it.
    #[must_use]
    pub const fn pending(&self) -> Option<Duration> {
        self.armed
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl TimerService for OneShotTimer {
    fn start_timer(&mut self, duration: Duration) {
        if let Some(previous) = self.armed.replace(duration) {
            warn!(
                "timer re-armed before expiry: {}ms dropped, {}ms pending",
                previous.as_millis(),
                duration.as_millis()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_slot() {
        let mut timer = OneShotTimer::new();
        assert!(!timer.is_armed());

        timer.start_timer(Duration::from_millis(300));
        assert_eq!(timer.pending(), Some(Duration::from_millis(300)));
        assert_eq!(timer.take(), Some(Duration::from_millis(300)));
        assert_eq!(timer.take(), None);
    }

    #[test]
    fn rearming_replaces_pending_duration() {
        let mut timer = OneShotTimer::new();
        timer.start_timer(Duration::from_millis(300));
        timer.start_timer(Duration::from_millis(200));
        assert_eq!(timer.take(), Some(Duration::from_millis(200)));
    }
}
