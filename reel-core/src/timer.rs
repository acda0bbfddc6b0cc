//! Playback clock.
//!
//! Wall-clock driven by the host through `update()`. The decode
//! orchestrator brackets restart and seek with pause/play so the
//! consumer never observes a frame mid-reset.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Playback timer. Time is stored in microseconds so reads and writes
/// stay atomic across threads.
pub struct Timer {
    time_us: AtomicI64,
    paused: AtomicBool,
    speed: Mutex<f64>,
}

impl Timer {
    /// New timer at t=0, paused.
    pub fn new() -> Self {
        Self {
            time_us: AtomicI64::new(0),
            paused: AtomicBool::new(true),
            speed: Mutex::new(1.0),
        }
    }

    /// Advance the clock by `delta` seconds of host time, scaled by the
    /// playback speed. No-op while paused.
    pub fn update(&self, delta: f64) {
        if self.paused.load(Ordering::SeqCst) {
            return;
        }
        let step = (delta * *self.speed.lock() * 1_000_000.0) as i64;
        self.time_us.fetch_add(step, Ordering::SeqCst);
    }

    /// Current playback time in seconds.
    pub fn time(&self) -> f64 {
        self.time_us.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn play(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Jump the clock to an absolute time in seconds.
    pub fn seek(&self, seconds: f64) {
        self.time_us
            .store((seconds * 1_000_000.0) as i64, Ordering::SeqCst);
    }

    pub fn set_speed(&self, speed: f64) {
        *self.speed.lock() = speed;
    }

    pub fn speed(&self) -> f64 {
        *self.speed.lock()
    }

    /// Rewind the clock to zero. Pause state is left untouched.
    pub fn reset(&self) {
        self.time_us.store(0, Ordering::SeqCst);
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_accumulates() {
        let timer = Timer::new();
        timer.play();
        timer.update(0.5);
        timer.update(0.25);
        assert!((timer.time() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_paused_holds_time() {
        let timer = Timer::new();
        assert!(timer.is_paused());
        timer.update(1.0);
        assert_eq!(timer.time(), 0.0);

        timer.play();
        timer.update(1.0);
        timer.pause();
        timer.update(1.0);
        assert!((timer.time() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_scales_updates() {
        let timer = Timer::new();
        timer.play();
        timer.set_speed(2.0);
        timer.update(0.5);
        assert!((timer.time() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_seek_sets_absolute_time() {
        let timer = Timer::new();
        timer.seek(1.5);
        assert!((timer.time() - 1.5).abs() < 1e-6);
        timer.reset();
        assert_eq!(timer.time(), 0.0);
    }
}
