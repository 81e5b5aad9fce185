//! Frame pacing: frame-rate clamping, an injectable clock, and the
//! minimum-interval gate between deliveries.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Lowest accepted frame rate
pub const MIN_FRAME_RATE: u32 = 1;
/// Highest accepted frame rate
pub const MAX_FRAME_RATE: u32 = 240;
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Target deliveries per second, always inside `MIN_FRAME_RATE..=MAX_FRAME_RATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate(u32);

impl FrameRate {
    pub fn new(fps: u32) -> Self {
        FrameRate(fps.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE))
    }

    pub fn fps(&self) -> u32 {
        self.0
    }

    /// Minimum time between two deliveries.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.0 as u64)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate(DEFAULT_FRAME_RATE)
    }
}

/// Time source for pacing decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock { now: Arc::new(Mutex::new(Instant::now())) }
    }

    pub fn advance(&self, by: Duration) {
        let mut g = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *g += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Tracks the last delivery time and decides whether another one may happen.
#[derive(Debug, Clone)]
pub struct FramePacer {
    rate: FrameRate,
    last_delivery: Option<Instant>,
}

impl FramePacer {
    pub fn new(rate: FrameRate) -> Self {
        FramePacer { rate, last_delivery: None }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Changing the rate never rewrites the last delivery stamp, so the new
    /// interval applies from the next delivery on.
    pub fn set_rate(&mut self, rate: FrameRate) {
        self.rate = rate;
    }

    pub fn interval(&self) -> Duration {
        self.rate.interval()
    }

    /// True when at least one interval has passed since the last delivery.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_delivery {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.rate.interval(),
        }
    }

    /// Time left until `ready` turns true.
    pub fn time_until_ready(&self, now: Instant) -> Duration {
        match self.last_delivery {
            None => Duration::ZERO,
            Some(last) => (last + self.rate.interval()).saturating_duration_since(now),
        }
    }

    pub fn mark_delivered(&mut self, now: Instant) {
        self.last_delivery = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_is_clamped() {
        assert_eq!(FrameRate::new(0).fps(), 1);
        assert_eq!(FrameRate::new(1000).fps(), 240);
        assert_eq!(FrameRate::new(30).fps(), 30);
        assert_eq!(FrameRate::new(50).interval(), Duration::from_millis(20));
    }

    #[test]
    fn pacer_gates_on_interval() {
        let clock = ManualClock::new();
        let mut p = FramePacer::new(FrameRate::new(10));
        assert!(p.ready(clock.now()));
        p.mark_delivered(clock.now());
        assert!(!p.ready(clock.now()));
        clock.advance(Duration::from_millis(99));
        assert!(!p.ready(clock.now()));
        assert_eq!(p.time_until_ready(clock.now()), Duration::from_millis(1));
        clock.advance(Duration::from_millis(1));
        assert!(p.ready(clock.now()));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        let start = b.now();
        a.advance(Duration::from_secs(1));
        assert_eq!(b.now() - start, Duration::from_secs(1));
    }
}
