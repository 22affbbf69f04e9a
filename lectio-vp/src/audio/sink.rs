//! Playback output seam
//!
//! The engine drives an `AudioSink` and never talks to the device directly.
//! The sink owns the shared pausable clock: `now()` advances only while the
//! output is running, so suspending it freezes elapsed time uniformly for
//! the sounding clip and for the pull-model progress math.

use crate::audio::clip::AudioClip;
use std::sync::Arc;

/// Natural end-of-clip notification.
///
/// `token` is the value passed to `AudioSink::start`. The engine starts
/// clips with the playback epoch as the token, which lets the completion
/// handler tell whether the finishing clip still belongs to the current
/// playback intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEvent {
    pub token: u64,
}

/// Hardware (or simulated) audio output surface.
///
/// Implementations deliver `CompletionEvent`s over the channel handed to
/// them at construction, exactly once per naturally completed clip. Clips
/// torn down by `stop`/`start` complete silently.
pub trait AudioSink: Send + Sync {
    /// Replace the sounding clip, starting `clip` at `rate`.
    fn start(&self, clip: Arc<AudioClip>, rate: f64, token: u64);

    /// Tear down the sounding clip without touching the clock.
    fn stop(&self);

    /// Suspend the shared clock and the sounding clip with it.
    fn suspend(&self);

    /// Resume the shared clock. No-op when already running.
    fn resume(&self);

    /// Apply a new rate to the sounding clip immediately.
    fn set_rate(&self, rate: f64);

    /// Set output volume (clamped to 0.0-1.0).
    fn set_volume(&self, volume: f32);

    /// Shared clock reading in seconds.
    fn now(&self) -> f64;
}
