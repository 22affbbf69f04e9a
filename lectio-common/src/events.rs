//! Event types for the Lectio event system
//!
//! Events describe state transitions for screen components (play controls,
//! chapter lists). Word-highlight timing is deliberately NOT pushed through
//! here: consumers of `ClipTiming` sample the shared clock themselves.

use crate::timing::ClipTiming;
use serde::{Deserialize, Serialize};

/// Playback engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing sounding, nothing loading (also the stalled state)
    Idle,
    /// A clip fetch is in flight for the current verse
    Loading,
    /// A clip is sounding
    Playing,
    /// A clip is sounding but the shared clock is suspended
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Lectio event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LectioEvent {
    /// Playback state changed
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A verse clip started sounding
    VerseStarted {
        chapter_id: String,
        verse_id: String,
        timing: ClipTiming,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A verse clip reached natural completion
    VerseCompleted {
        chapter_id: String,
        verse_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// No clip could be produced for the requested verse; playback stalled
    PlaybackStalled {
        chapter_id: String,
        verse_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed
    RateChanged {
        rate: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Output volume changed
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback stopped (user stop or end of corpus)
    PlaybackStopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}
