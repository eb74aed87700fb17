//! Frame timing for the render loop.

use std::time::{Duration, Instant};

/// Longest frame delta handed to the simulation. A window drag or debugger pause
/// otherwise shows up as one giant step in the demo clock.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Per-frame delta and total elapsed time.
#[derive(Debug)]
pub struct Time {
    /// Time of the last frame.
    last_frame: Instant,
    /// Duration of the last frame, clamped to [`MAX_FRAME_DELTA`].
    delta: Duration,
    /// Sum of clamped deltas since start.
    elapsed: Duration,
    frame_count: u64,
    /// Exponentially smoothed frame time, for the FPS readout.
    smoothed: f32,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            smoothed: 0.0,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        let raw = now - self.last_frame;
        self.last_frame = now;
        self.advance(raw);
    }

    /// Step the clock by an explicit duration (used by `update` and by tests).
    pub fn advance(&mut self, raw: Duration) {
        self.delta = raw.min(MAX_FRAME_DELTA);
        self.elapsed += self.delta;
        self.frame_count += 1;
        let dt = self.delta.as_secs_f32();
        self.smoothed = if self.frame_count == 1 { dt } else { self.smoothed * 0.9 + dt * 0.1 };
    }

    /// Delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Smoothed frames per second.
    pub fn fps(&self) -> f32 {
        if self.smoothed > 0.0 {
            1.0 / self.smoothed
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(16));
        assert_eq!(time.frame_count(), 2);
        assert!((time.elapsed_seconds() - 0.032).abs() < 1e-6);
        assert!((time.delta_seconds() - 0.016).abs() < 1e-6);
        assert!((time.fps() - 62.5).abs() < 0.1);
    }

    /// A stall is reported as one clamped frame.
    #[test]
    fn long_frames_are_clamped() {
        let mut time = Time::new();
        time.advance(Duration::from_secs(5));
        assert_eq!(time.delta(), MAX_FRAME_DELTA);
        assert_eq!(time.elapsed_seconds(), MAX_FRAME_DELTA.as_secs_f32());
    }
}
