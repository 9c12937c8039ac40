//! # Frame Pacer
//!
//! Caps the loop at a target frame rate.
//!
//! ## Design
//!
//! - Sleep for most of the remaining frame time, spin for the last 500µs
//! - A late frame does not trigger a burst of catch-up frames: the
//!   schedule restarts from "now"
//! - The target can change between frames (`fps` is live-editable)

use std::time::{Duration, Instant};

/// Spin-wait window at the end of each frame.
const SPIN_WINDOW: Duration = Duration::from_micros(500);

/// Fixed-rate frame pacer.
#[derive(Debug, Clone)]
pub struct FramePacer {
    /// Target frame period.
    period: Duration,
    /// Scheduled start of the current frame.
    frame_start: Instant,
}

impl FramePacer {
    /// Creates a pacer for `fps` frames per second. `fps` of 0 is treated as 1.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            period: period_for(fps),
            frame_start: Instant::now(),
        }
    }

    /// Changes the target rate, effective from the next `wait()`.
    pub fn set_fps(&mut self, fps: u32) {
        self.period = period_for(fps);
    }

    /// Target frame period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Blocks until the current frame's period has elapsed.
    ///
    /// Returns `false` if the deadline had already passed. The caller
    /// counts those; the pacer itself keeps no statistics.
    pub fn wait(&mut self) -> bool {
        let deadline = self.frame_start + self.period;
        let now = Instant::now();

        if now >= deadline {
            self.frame_start = now;
            return false;
        }

        let remaining = deadline - now;
        if remaining > SPIN_WINDOW * 2 {
            std::thread::sleep(remaining - SPIN_WINDOW);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }

        self.frame_start = deadline;
        true
    }
}

fn period_for(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period() {
        assert_eq!(FramePacer::new(50).period(), Duration::from_millis(20));
        assert_eq!(FramePacer::new(0).period(), Duration::from_secs(1));
    }

    #[test]
    fn test_wait_paces_frames() {
        let mut pacer = FramePacer::new(100);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.wait();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "too slow: {elapsed:?}");
    }

    #[test]
    fn test_late_frame_is_reported_and_not_caught_up() {
        let mut pacer = FramePacer::new(200);
        std::thread::sleep(Duration::from_millis(30));
        assert!(!pacer.wait());

        // Schedule restarted: the next frame waits a full period.
        let start = Instant::now();
        assert!(pacer.wait());
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn test_set_fps_takes_effect() {
        let mut pacer = FramePacer::new(10);
        pacer.set_fps(500);
        assert_eq!(pacer.period(), Duration::from_millis(2));
    }
}
