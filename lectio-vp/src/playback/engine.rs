//! Playback scheduling
//!
//! Owns the single sounding clip and every transition between verses: epoch
//! minting, clip acquisition, handoff to the output, gapless auto-advance on
//! natural completion, and pause/resume by suspending the shared clock.
//!
//! Failure semantics: a verse that cannot produce a clip stalls playback
//! (state returns to idle, the verse stays current for display) with no
//! automatic retry or skip. A stale epoch is not an error; the continuation
//! simply returns without touching shared state.

use crate::audio::sink::{AudioSink, CompletionEvent};
use crate::error::{Error, Result};
use crate::playback::fetch::FetchCoordinator;
use crate::playback::navigator::{Navigator, VersePosition};
use crate::playback::prefetch::Prefetcher;
use crate::playback::session::SessionGuard;
use crate::state::{CurrentVerse, PlaybackSnapshot, SharedState};
use lectio_common::events::{LectioEvent, PlaybackState};
use lectio_common::{time, ClipTiming};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

/// Playback rate bounds, enforced for the configured initial rate and for
/// live rate changes alike.
pub const RATE_MIN: f64 = 0.25;
pub const RATE_MAX: f64 = 4.0;

/// Playback engine - orchestrates cache, fetch, navigation, and output
pub struct PlayerEngine {
    state: Arc<SharedState>,
    navigator: Arc<Navigator>,
    fetcher: Arc<FetchCoordinator>,
    prefetcher: Prefetcher,
    sink: Arc<dyn AudioSink>,
    guard: SessionGuard,
    /// Serializes the epoch-checked commit sections of competing plays and
    /// stops, so a currency check and the state mutation behind it are
    /// atomic with respect to each other.
    commit: Mutex<()>,
}

impl PlayerEngine {
    pub fn new(
        navigator: Arc<Navigator>,
        fetcher: Arc<FetchCoordinator>,
        prefetcher: Prefetcher,
        sink: Arc<dyn AudioSink>,
        state: Arc<SharedState>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            navigator,
            fetcher,
            prefetcher,
            sink,
            guard: SessionGuard::new(),
            commit: Mutex::new(()),
        })
    }

    /// Spawn the auto-advance task consuming the sink's completion events.
    /// Call once after construction.
    pub fn spawn_completion_pump(
        self: &Arc<Self>,
        mut completion_rx: mpsc::UnboundedReceiver<CompletionEvent>,
    ) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = completion_rx.recv().await {
                engine.on_clip_completed(event).await;
            }
            debug!("Completion channel closed, auto-advance task exiting");
        });
    }

    /// Begin playback of one verse, superseding any in-flight load.
    ///
    /// Returns an error only for a verse/chapter pair not in the corpus;
    /// synthesis and decode failures surface as a stall, not an error.
    pub async fn play(&self, chapter_id: &str, verse_id: &str) -> Result<()> {
        let position = self.navigator.position(chapter_id, verse_id).ok_or_else(|| {
            Error::Playback(format!("verse {} not in chapter {}", verse_id, chapter_id))
        })?;
        self.play_position(position).await;
        Ok(())
    }

    async fn play_position(&self, position: VersePosition) {
        let epoch = self.guard.begin();
        self.run_play(position, epoch).await;
    }

    /// Auto-advance entry: claims the epoch with a compare-exchange so the
    /// chain only proceeds if the completed clip's epoch is still current.
    /// A manual play or stop racing the completion mints first and wins.
    async fn chain_position(&self, position: VersePosition, completed: u64) {
        match self.guard.begin_if_current(completed) {
            Some(epoch) => self.run_play(position, epoch).await,
            None => debug!(token = completed, "Auto-advance superseded before it began"),
        }
    }

    async fn run_play(&self, position: VersePosition, epoch: u64) {
        info!(
            chapter_id = %position.chapter_id,
            verse_id = %position.verse.id,
            epoch,
            "Play requested"
        );

        {
            let _commit = self.commit.lock().await;
            if !self.guard.is_current(epoch) {
                return; // an even newer play arrived before we got here
            }
            // Tear down whatever was sounding and present the loading state.
            // The shared clock keeps running (or restarts) while loading.
            self.sink.stop();
            self.sink.resume();
            self.state.set_timing(None).await;
            self.state
                .set_current_verse(Some(CurrentVerse {
                    chapter_id: position.chapter_id.clone(),
                    verse_id: position.verse.id.clone(),
                }))
                .await;
            self.transition(PlaybackState::Loading).await;
        }

        // Warm the lookahead on every play, not only on transitions.
        self.prefetcher.warm(&position.chapter_id, &position.verse.id);

        let outcome = self.fetcher.fetch_or_join(&position.verse).await;

        let _commit = self.commit.lock().await;
        if !self.guard.is_current(epoch) {
            debug!(
                verse_id = %position.verse.id,
                epoch,
                "Discarding superseded fetch result"
            );
            return;
        }

        match outcome {
            Some(clip) => {
                let rate = self.state.rate().await;
                self.sink.start(Arc::clone(&clip), rate, epoch);
                let timing = ClipTiming::new(self.sink.now(), clip.duration_seconds);
                self.state.set_timing(Some(timing)).await;
                self.transition(PlaybackState::Playing).await;
                self.state.broadcast_event(LectioEvent::VerseStarted {
                    chapter_id: position.chapter_id.clone(),
                    verse_id: position.verse.id.clone(),
                    timing,
                    timestamp: time::now(),
                });
                info!(
                    verse_id = %position.verse.id,
                    duration_seconds = clip.duration_seconds,
                    rate,
                    "Verse sounding"
                );
            }
            None => {
                // Recoverable stall: no clip, no auto-retry, no auto-skip.
                // The verse stays current so a screen can show where
                // playback stopped short.
                self.transition(PlaybackState::Idle).await;
                self.state.broadcast_event(LectioEvent::PlaybackStalled {
                    chapter_id: position.chapter_id.clone(),
                    verse_id: position.verse.id.clone(),
                    timestamp: time::now(),
                });
                warn!(verse_id = %position.verse.id, "No clip available, playback stalled");
            }
        }
    }

    /// Natural completion handler: chain to the next verse, or stop cleanly
    /// at the end of the corpus.
    async fn on_clip_completed(&self, event: CompletionEvent) {
        // The currency check and the current-verse read must observe a
        // consistent pair: a play that has already minted a newer epoch
        // fails the check here, and one that has not cannot swap the
        // current verse until the commit lock is free.
        let current = {
            let _commit = self.commit.lock().await;
            if !self.guard.is_current(event.token) {
                debug!(token = event.token, "Ignoring completion from a superseded clip");
                return;
            }
            match self.state.current_verse().await {
                Some(current) => current,
                None => return,
            }
        };
        self.state.broadcast_event(LectioEvent::VerseCompleted {
            chapter_id: current.chapter_id.clone(),
            verse_id: current.verse_id.clone(),
            timestamp: time::now(),
        });
        match self
            .navigator
            .relative(&current.chapter_id, &current.verse_id, 1)
        {
            Some(next) => {
                debug!(from = %current.verse_id, to = %next.verse.id, "Auto-advancing");
                self.chain_position(next, event.token).await;
            }
            None => {
                info!("End of corpus reached");
                self.chain_stop(event.token).await;
            }
        }
    }

    /// Suspend the shared clock. The sounding clip and the timing basis are
    /// untouched, so resume continues exactly where playback left off with
    /// no re-fetch and no discontinuity in elapsed time.
    pub async fn pause(&self) {
        let state = self.state.playback_state().await;
        if state != PlaybackState::Playing {
            debug!(%state, "Pause ignored");
            return;
        }
        self.sink.suspend();
        self.transition(PlaybackState::Paused).await;
        info!("Playback paused");
    }

    /// Resume the shared clock after `pause`.
    pub async fn resume(&self) {
        let state = self.state.playback_state().await;
        if state != PlaybackState::Paused {
            debug!(%state, "Resume ignored");
            return;
        }
        self.sink.resume();
        self.transition(PlaybackState::Playing).await;
        info!("Playback resumed");
    }

    /// Stop playback and invalidate all in-flight work.
    pub async fn stop(&self) {
        let epoch = self.guard.begin();
        self.run_stop(epoch).await;
    }

    /// End-of-corpus stop from the auto-advance path: only stops if the
    /// completed clip's epoch is still current (a racing play wins).
    async fn chain_stop(&self, completed: u64) {
        match self.guard.begin_if_current(completed) {
            Some(epoch) => self.run_stop(epoch).await,
            None => debug!(token = completed, "Chain-end stop superseded before it began"),
        }
    }

    async fn run_stop(&self, epoch: u64) {
        let _commit = self.commit.lock().await;
        if !self.guard.is_current(epoch) {
            return; // a newer play superseded this stop
        }
        self.sink.stop();
        self.state.set_timing(None).await;
        self.state.set_current_verse(None).await;
        self.transition(PlaybackState::Idle).await;
        self.state.broadcast_event(LectioEvent::PlaybackStopped {
            timestamp: time::now(),
        });
        info!(epoch, "Playback stopped");
    }

    /// Play the verse after the current one. No-op at corpus end or when
    /// nothing is current.
    pub async fn play_next(&self) {
        if let Some(current) = self.state.current_verse().await {
            match self
                .navigator
                .relative(&current.chapter_id, &current.verse_id, 1)
            {
                Some(next) => self.play_position(next).await,
                None => debug!("play_next at end of corpus"),
            }
        }
    }

    /// Play the verse before the current one, crossing back into the
    /// previous chapter when needed.
    pub async fn play_prev(&self) {
        if let Some(current) = self.state.current_verse().await {
            match self
                .navigator
                .relative(&current.chapter_id, &current.verse_id, -1)
            {
                Some(prev) => self.play_position(prev).await,
                None => debug!("play_prev at start of corpus"),
            }
        }
    }

    /// Jump to the first verse of the next chapter.
    pub async fn skip_next_chapter(&self) {
        if let Some(current) = self.state.current_verse().await {
            match self.navigator.first_of_next_chapter(&current.chapter_id) {
                Some(target) => self.play_position(target).await,
                None => debug!("skip_next_chapter at last chapter"),
            }
        }
    }

    /// Jump to the first verse of the previous chapter.
    pub async fn skip_prev_chapter(&self) {
        if let Some(current) = self.state.current_verse().await {
            match self.navigator.first_of_prev_chapter(&current.chapter_id) {
                Some(target) => self.play_position(target).await,
                None => debug!("skip_prev_chapter at first chapter"),
            }
        }
    }

    /// Store the playback rate and apply it to the sounding clip
    /// immediately. Stored clip durations are never rescaled; progress
    /// consumers divide by the current rate.
    pub async fn set_rate(&self, rate: f64) -> Result<()> {
        if !(RATE_MIN..=RATE_MAX).contains(&rate) {
            return Err(Error::Playback(format!(
                "rate {} outside {}-{}",
                rate, RATE_MIN, RATE_MAX
            )));
        }
        self.state.set_rate(rate).await;
        self.sink.set_rate(rate);
        self.state.broadcast_event(LectioEvent::RateChanged {
            rate,
            timestamp: time::now(),
        });
        info!(rate, "Playback rate changed");
        Ok(())
    }

    /// Set output volume (clamped to 0.0-1.0).
    pub async fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.sink.set_volume(clamped);
        self.state.broadcast_event(LectioEvent::VolumeChanged {
            volume: clamped,
            timestamp: time::now(),
        });
    }

    /// Read-only state for UI consumers.
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.state.snapshot().await
    }

    /// Shared clock reading for pull-model progress computation.
    pub fn now(&self) -> f64 {
        self.sink.now()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LectioEvent> {
        self.state.subscribe_events()
    }

    async fn transition(&self, new_state: PlaybackState) {
        let old_state = self.state.set_playback_state(new_state).await;
        if old_state != new_state {
            debug!(%old_state, %new_state, "Playback state changed");
            self.state.broadcast_event(LectioEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: time::now(),
            });
        }
    }
}
