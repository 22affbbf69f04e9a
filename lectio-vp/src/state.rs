//! Shared playback state
//!
//! Thread-safe state shared between the engine, its background tasks, and
//! UI readers. Fields use RwLock for concurrent read access with rare
//! writes; state-transition events fan out over a broadcast channel.

use lectio_common::events::{LectioEvent, PlaybackState};
use lectio_common::ClipTiming;
use tokio::sync::{broadcast, RwLock};

/// Verse currently associated with playback (sounding, loading, or the
/// verse a stall happened on).
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentVerse {
    pub chapter_id: String,
    pub verse_id: String,
}

/// Read-only view for UI consumers.
///
/// `timing` is the pull-model basis: combine it with the engine clock and
/// the current rate to compute progress; it survives pause untouched and is
/// cleared on stop.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub current: Option<CurrentVerse>,
    pub rate: f64,
    pub timing: Option<ClipTiming>,
}

/// Shared state accessible by all components
pub struct SharedState {
    playback_state: RwLock<PlaybackState>,
    current_verse: RwLock<Option<CurrentVerse>>,
    rate: RwLock<f64>,
    timing: RwLock<Option<ClipTiming>>,
    event_tx: broadcast::Sender<LectioEvent>,
}

impl SharedState {
    pub fn new(initial_rate: f64) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            playback_state: RwLock::new(PlaybackState::Idle),
            current_verse: RwLock::new(None),
            rate: RwLock::new(initial_rate),
            timing: RwLock::new(None),
            event_tx,
        }
    }

    /// Broadcast an event to all listeners (no receivers is fine)
    pub fn broadcast_event(&self, event: LectioEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LectioEvent> {
        self.event_tx.subscribe()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    /// Set playback state, returning the previous value.
    pub async fn set_playback_state(&self, state: PlaybackState) -> PlaybackState {
        std::mem::replace(&mut *self.playback_state.write().await, state)
    }

    pub async fn is_playing(&self) -> bool {
        *self.playback_state.read().await == PlaybackState::Playing
    }

    pub async fn is_loading(&self) -> bool {
        *self.playback_state.read().await == PlaybackState::Loading
    }

    pub async fn current_verse(&self) -> Option<CurrentVerse> {
        self.current_verse.read().await.clone()
    }

    pub async fn set_current_verse(&self, verse: Option<CurrentVerse>) {
        *self.current_verse.write().await = verse;
    }

    pub async fn rate(&self) -> f64 {
        *self.rate.read().await
    }

    pub async fn set_rate(&self, rate: f64) {
        *self.rate.write().await = rate;
    }

    pub async fn timing(&self) -> Option<ClipTiming> {
        *self.timing.read().await
    }

    pub async fn set_timing(&self, timing: Option<ClipTiming>) {
        *self.timing.write().await = timing;
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.playback_state().await,
            current: self.current_verse().await,
            rate: self.rate().await,
            timing: self.timing().await,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
