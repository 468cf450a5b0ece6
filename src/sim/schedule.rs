//! Rate limiters driven by the engine clock
//!
//! Both take the current time as an argument instead of owning a timer, so
//! tests can drive them with a virtual clock.

use super::Millis;

/// Coalesces scale requests and releases the latest one at most once per window.
///
/// The first request opens a window; later requests inside the same window
/// only replace the pending target.
#[derive(Debug, Clone)]
pub struct ScaleScheduler {
    window: Millis,
    pending: Option<f32>,
    due_at: Millis,
}

impl ScaleScheduler {
    pub fn new(window: Millis) -> Self {
        Self {
            window,
            pending: None,
            due_at: 0.0,
        }
    }

    pub fn request(&mut self, target: f32, now: Millis) {
        if self.pending.is_none() {
            self.due_at = now + self.window;
        }
        self.pending = Some(target);
    }

    /// Take the pending target once its window has elapsed
    pub fn poll(&mut self, now: Millis) -> Option<f32> {
        if now >= self.due_at {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Allows an action at most once per interval (leading edge)
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Millis,
    last: Option<Millis>,
}

impl Throttle {
    pub fn new(interval: Millis) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true (and records the time) if the action may run now
    pub fn try_fire(&mut self, now: Millis) -> bool {
        match self.last {
            Some(last) if now - last < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_coalesces_within_window() {
        let mut sched = ScaleScheduler::new(1000.0);
        sched.request(1.01, 0.0);
        sched.request(1.02, 300.0);
        sched.request(1.03, 900.0);
        assert_eq!(sched.poll(999.0), None);
        assert_eq!(sched.poll(1000.0), Some(1.03), "Latest target wins");
        assert_eq!(sched.poll(1500.0), None, "Nothing left");
    }

    #[test]
    fn test_scheduler_fires_at_most_once_per_window() {
        let mut sched = ScaleScheduler::new(1000.0);
        let mut applied = 0;
        let mut now = 0.0;
        // A request every engine step for five seconds
        while now < 5000.0 {
            sched.request(1.0, now);
            if sched.poll(now).is_some() {
                applied += 1;
            }
            now += 1000.0 / 60.0;
        }
        assert!(applied <= 5, "Applied {} times in 5s", applied);
        assert!(applied >= 4, "Continuous requests still get applied");
    }

    #[test]
    fn test_throttle() {
        let mut throttle = Throttle::new(200.0);
        assert!(throttle.try_fire(0.0));
        assert!(!throttle.try_fire(100.0));
        assert!(!throttle.try_fire(199.0));
        assert!(throttle.try_fire(200.0));
        assert!(!throttle.try_fire(250.0));
    }
}
