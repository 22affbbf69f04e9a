//! Fetch coordination: dedup, retry, cache fill
//!
//! All clip acquisition funnels through `fetch_or_join`. For a given verse
//! id at most one synthesis request is outstanding at a time; concurrent
//! callers join the pending ticket and observe the same outcome. The ticket
//! is removed when the fetch settles, success or failure, before the
//! outcome is delivered to the joined callers.
//!
//! Failures resolve to `None` here. Nothing above this boundary branches on
//! failure kind: an exhausted retry loop and a decode error both surface as
//! "no clip available".

use crate::audio::clip::AudioClip;
use crate::audio::decode::ClipDecoder;
use crate::playback::cache::ClipCache;
use crate::synth::SpeechSynthesizer;
use lectio_common::Verse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

type FetchOutcome = Option<Arc<AudioClip>>;

enum Ticket {
    /// This caller runs the fetch and settles the ticket.
    Lead(broadcast::Sender<FetchOutcome>),
    /// Another caller is already fetching; await its outcome.
    Join(broadcast::Receiver<FetchOutcome>),
}

pub struct FetchCoordinator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    decoder: Arc<dyn ClipDecoder>,
    cache: Arc<ClipCache>,
    /// In-flight fetch tickets, at most one per verse id.
    /// Held only across synchronous sections, never across an await.
    tickets: Mutex<HashMap<String, broadcast::Sender<FetchOutcome>>>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl FetchCoordinator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        decoder: Arc<dyn ClipDecoder>,
        cache: Arc<ClipCache>,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            synthesizer,
            decoder,
            cache,
            tickets: Mutex::new(HashMap::new()),
            max_retries,
            retry_backoff,
        }
    }

    pub fn cache(&self) -> &ClipCache {
        &self.cache
    }

    /// Fetch the clip for `verse`, joining any in-flight request for the
    /// same verse id. `None` means no clip could be produced.
    pub async fn fetch_or_join(&self, verse: &Verse) -> FetchOutcome {
        // Fast path: cached (the lookup also promotes recency).
        if let Some(clip) = self.cache.get(&verse.id) {
            return Some(clip);
        }

        let ticket = {
            let mut tickets = self.tickets.lock().unwrap();
            // Re-check under the lock: another caller may have settled
            // between the cache probe and here.
            if let Some(clip) = self.cache.get(&verse.id) {
                return Some(clip);
            }
            match tickets.get(&verse.id) {
                Some(tx) => Ticket::Join(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    tickets.insert(verse.id.clone(), tx.clone());
                    Ticket::Lead(tx)
                }
            }
        };

        match ticket {
            Ticket::Join(mut rx) => {
                debug!(verse_id = %verse.id, "Joining in-flight fetch");
                rx.recv().await.ok().flatten()
            }
            Ticket::Lead(tx) => {
                let outcome = self.produce(verse).await;
                // Remove the ticket before delivering, success or failure.
                self.tickets.lock().unwrap().remove(&verse.id);
                let _ = tx.send(outcome.clone());
                outcome
            }
        }
    }

    /// Synthesize, decode, and cache one clip.
    async fn produce(&self, verse: &Verse) -> FetchOutcome {
        let bytes = self.synthesize_with_retry(verse).await?;
        match self.decoder.decode(&verse.id, &bytes) {
            Ok(clip) => {
                let clip = Arc::new(clip);
                self.cache.insert(&verse.id, Arc::clone(&clip));
                debug!(
                    verse_id = %verse.id,
                    duration_seconds = clip.duration_seconds,
                    "Clip decoded and cached"
                );
                Some(clip)
            }
            Err(e) => {
                warn!(verse_id = %verse.id, error = %e, "Decode failed, no clip available");
                None
            }
        }
    }

    /// Bounded retry with exponential backoff around the synthesis call.
    async fn synthesize_with_retry(&self, verse: &Verse) -> Option<Vec<u8>> {
        let mut backoff = self.retry_backoff;
        for attempt in 0..=self.max_retries {
            match self.synthesizer.synthesize(&verse.text).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => {
                    if attempt == self.max_retries {
                        warn!(
                            verse_id = %verse.id,
                            attempts = attempt + 1,
                            error = %e,
                            "Synthesis failed, retries exhausted"
                        );
                        return None;
                    }
                    warn!(
                        verse_id = %verse.id,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Synthesis failed, will retry after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSynth {
        calls: AtomicUsize,
        failures_before_success: usize,
    }

    impl CountingSynth {
        fn new(failures_before_success: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures_before_success,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                Err(Error::Synthesis("transient outage".to_string()))
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }
    }

    struct FixedDecoder;

    impl ClipDecoder for FixedDecoder {
        fn decode(&self, verse_id: &str, _bytes: &[u8]) -> Result<AudioClip> {
            Ok(AudioClip::new(verse_id, vec![0.0; 8000], 8000))
        }
    }

    struct RejectingDecoder;

    impl ClipDecoder for RejectingDecoder {
        fn decode(&self, _verse_id: &str, _bytes: &[u8]) -> Result<AudioClip> {
            Err(Error::Decode("corrupt payload".to_string()))
        }
    }

    fn verse(id: &str) -> Verse {
        Verse {
            id: id.to_string(),
            ordinal: 1,
            text: format!("text of {}", id),
        }
    }

    fn coordinator(
        synth: Arc<CountingSynth>,
        decoder: Arc<dyn ClipDecoder>,
    ) -> FetchCoordinator {
        FetchCoordinator::new(
            synth,
            decoder,
            Arc::new(ClipCache::new(8)),
            2,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_success_fills_cache() {
        let synth = CountingSynth::new(0);
        let fetcher = coordinator(Arc::clone(&synth), Arc::new(FixedDecoder));

        let clip = fetcher.fetch_or_join(&verse("v1")).await.unwrap();
        assert_eq!(clip.verse_id, "v1");
        assert!(fetcher.cache().contains("v1"));

        // Second fetch is served from cache without a network call.
        fetcher.fetch_or_join(&verse("v1")).await.unwrap();
        assert_eq!(synth.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let synth = CountingSynth::new(2);
        let fetcher = coordinator(Arc::clone(&synth), Arc::new(FixedDecoder));

        let clip = fetcher.fetch_or_join(&verse("v1")).await;
        assert!(clip.is_some());
        assert_eq!(synth.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_none_and_release_ticket() {
        let synth = CountingSynth::new(usize::MAX);
        let fetcher = coordinator(Arc::clone(&synth), Arc::new(FixedDecoder));

        assert!(fetcher.fetch_or_join(&verse("v1")).await.is_none());
        assert_eq!(synth.calls(), 3);
        assert!(!fetcher.cache().contains("v1"));

        // The ticket was removed, so a later request starts fresh.
        assert!(fetcher.fetch_or_join(&verse("v1")).await.is_none());
        assert_eq!(synth.calls(), 6);
    }

    #[tokio::test]
    async fn test_decode_failure_is_no_clip() {
        let synth = CountingSynth::new(0);
        let fetcher = coordinator(Arc::clone(&synth), Arc::new(RejectingDecoder));

        assert!(fetcher.fetch_or_join(&verse("v1")).await.is_none());
        // Decode failures are terminal for the attempt; no retry loop.
        assert_eq!(synth.calls(), 1);
        assert!(!fetcher.cache().contains("v1"));
    }
}
