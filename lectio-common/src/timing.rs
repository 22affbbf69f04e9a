//! Timing snapshot for the pull-model progress contract
//!
//! The engine publishes one `ClipTiming` per successfully started clip. A
//! consumer (the word-highlighting effect) samples the shared output clock
//! on its own animation cadence and computes progress itself; the engine
//! never ticks or pushes timing updates.

use serde::{Deserialize, Serialize};

/// Timing basis for the currently sounding clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipTiming {
    /// Shared-clock time at which the clip started sounding (seconds).
    pub start_timestamp: f64,
    /// Clip duration at rate 1.0 (seconds). Never rescaled when the
    /// playback rate changes; consumers divide by the current rate.
    pub duration_seconds: f64,
}

impl ClipTiming {
    pub fn new(start_timestamp: f64, duration_seconds: f64) -> Self {
        Self {
            start_timestamp,
            duration_seconds,
        }
    }

    /// Seconds of shared-clock time elapsed since the clip started.
    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.start_timestamp
    }

    /// Fraction of the clip played at shared-clock time `now`, given the
    /// current playback rate. Clamped to [0.0, 1.0].
    pub fn progress(&self, now: f64, rate: f64) -> f64 {
        if self.duration_seconds <= 0.0 || rate <= 0.0 {
            return 0.0;
        }
        let effective = self.duration_seconds / rate;
        (self.elapsed(now) / effective).clamp(0.0, 1.0)
    }
}
