use std::time::{Duration, Instant};

/// Elapsed song time, which stands still while the song is paused.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    running_since: Option<Instant>,
    banked: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts or resumes accumulating from whatever has been banked so far.
    pub fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.banked += now.saturating_duration_since(since);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.banked + now.saturating_duration_since(since),
            None => self.banked,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pause_time_is_excluded() {
        let t0 = Instant::now();
        let secs = Duration::from_secs;
        let mut clock = PlaybackClock::new();

        clock.start(t0);
        assert_eq!(clock.elapsed(t0 + secs(2)), secs(2));

        clock.pause(t0 + secs(2));
        assert_eq!(clock.elapsed(t0 + secs(5)), secs(2));

        clock.start(t0 + secs(5));
        assert_eq!(clock.elapsed(t0 + secs(6)), secs(3));
    }

    #[test]
    fn repeated_start_does_not_restart() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();

        clock.start(t0);
        clock.start(t0 + Duration::from_secs(1));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(2)), Duration::from_secs(2));

        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(9)), Duration::ZERO);
    }
}
