//! Shared test fixtures: scripted synthesizer, stub decoder, manual sink,
//! and an assembled engine harness.
#![allow(dead_code)]

use async_trait::async_trait;
use lectio_common::corpus::{Chapter, Corpus, Verse};
use lectio_common::events::LectioEvent;
use lectio_vp::audio::clip::AudioClip;
use lectio_vp::audio::decode::ClipDecoder;
use lectio_vp::audio::sink::{AudioSink, CompletionEvent};
use lectio_vp::error::{Error, Result};
use lectio_vp::playback::cache::ClipCache;
use lectio_vp::playback::engine::PlayerEngine;
use lectio_vp::playback::fetch::FetchCoordinator;
use lectio_vp::playback::navigator::Navigator;
use lectio_vp::playback::prefetch::Prefetcher;
use lectio_vp::state::SharedState;
use lectio_vp::synth::SpeechSynthesizer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};

/// Verse text used throughout the fixtures, derived from the verse id.
pub fn text_of(verse_id: &str) -> String {
    format!("text of {}", verse_id)
}

pub fn verse(id: &str, ordinal: u32) -> Verse {
    Verse {
        id: id.to_string(),
        ordinal,
        text: text_of(id),
    }
}

/// Build a corpus from `(chapter_id, [verse ids])` pairs.
pub fn corpus(chapters: &[(&str, &[&str])]) -> Arc<Corpus> {
    let corpus = Corpus {
        chapters: chapters
            .iter()
            .map(|(chapter_id, verse_ids)| Chapter {
                id: chapter_id.to_string(),
                title: String::new(),
                verses: verse_ids
                    .iter()
                    .enumerate()
                    .map(|(n, id)| verse(id, n as u32 + 1))
                    .collect(),
            })
            .collect(),
    };
    corpus.validate().unwrap();
    Arc::new(corpus)
}

/// Corpus of two chapters: ch1 = [v1, v2], ch2 = [v3].
pub fn two_chapter_corpus() -> Arc<Corpus> {
    corpus(&[("ch1", &["v1", "v2"]), ("ch2", &["v3"])])
}

#[derive(Clone)]
enum Script {
    Fail,
    FailTimes(usize),
    Hold(Arc<Notify>),
}

/// Synthesizer scripted per verse: instant success by default, or failures
/// and held responses keyed by verse id.
pub struct ScriptedSynthesizer {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        })
    }

    /// Every request for this verse fails.
    pub fn fail_always(&self, verse_id: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(text_of(verse_id), Script::Fail);
    }

    /// The first `times` requests for this verse fail, later ones succeed.
    pub fn fail_times(&self, verse_id: &str, times: usize) {
        self.scripts
            .lock()
            .unwrap()
            .insert(text_of(verse_id), Script::FailTimes(times));
    }

    /// Requests for this verse block until `release` is called.
    pub fn hold(&self, verse_id: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(text_of(verse_id), Script::Hold(Arc::new(Notify::new())));
    }

    /// Let a held request complete successfully; later requests also succeed.
    pub fn release(&self, verse_id: &str) {
        match self.scripts.lock().unwrap().remove(&text_of(verse_id)) {
            Some(Script::Hold(notify)) => notify.notify_one(),
            _ => panic!("release() without hold() for {}", verse_id),
        }
    }

    /// Let a held request fail; later requests also fail.
    pub fn release_with_failure(&self, verse_id: &str) {
        let old = self
            .scripts
            .lock()
            .unwrap()
            .insert(text_of(verse_id), Script::Fail);
        match old {
            Some(Script::Hold(notify)) => notify.notify_one(),
            _ => panic!("release_with_failure() without hold() for {}", verse_id),
        }
    }

    /// Number of synthesis requests seen for this verse.
    pub fn calls_for(&self, verse_id: &str) -> usize {
        *self
            .calls
            .lock()
            .unwrap()
            .get(&text_of(verse_id))
            .unwrap_or(&0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(text.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let script = self.scripts.lock().unwrap().get(text).cloned();
        match script {
            Some(Script::Fail) => Err(Error::Synthesis("scripted failure".to_string())),
            Some(Script::FailTimes(times)) if count <= times => {
                Err(Error::Synthesis("scripted transient failure".to_string()))
            }
            Some(Script::Hold(notify)) => {
                notify.notified().await;
                // The script may have been swapped while held.
                match self.scripts.lock().unwrap().get(text) {
                    Some(Script::Fail) => {
                        Err(Error::Synthesis("scripted failure".to_string()))
                    }
                    _ => Ok(text.as_bytes().to_vec()),
                }
            }
            _ => Ok(text.as_bytes().to_vec()),
        }
    }
}

/// Decoder producing a fixed-duration clip regardless of payload.
pub struct StubDecoder {
    pub sample_rate: u32,
    pub duration_seconds: f64,
}

impl Default for StubDecoder {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            duration_seconds: 1.0,
        }
    }
}

impl ClipDecoder for StubDecoder {
    fn decode(&self, verse_id: &str, bytes: &[u8]) -> Result<AudioClip> {
        if bytes.is_empty() {
            return Err(Error::Decode("empty payload".to_string()));
        }
        let samples = vec![0.0; (self.duration_seconds * self.sample_rate as f64) as usize];
        Ok(AudioClip::new(verse_id, samples, self.sample_rate))
    }
}

/// Operations observed by the manual sink, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    Start { verse_id: String, rate: f64, token: u64 },
    Stop,
    Suspend,
    Resume,
    SetRate(f64),
    SetVolume(f32),
}

/// Hand-driven sink: the test advances the clock and fires completions.
/// The clock only advances while running, mirroring a suspended device.
pub struct ManualSink {
    ops: Mutex<Vec<SinkOp>>,
    clock: Mutex<f64>,
    running: Mutex<bool>,
    current_token: Mutex<Option<u64>>,
}

impl ManualSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ops: Mutex::new(Vec::new()),
            clock: Mutex::new(0.0),
            running: Mutex::new(true),
            current_token: Mutex::new(None),
        })
    }

    /// Advance the clock by `seconds`, but only while running.
    pub fn advance(&self, seconds: f64) {
        if *self.running.lock().unwrap() {
            *self.clock.lock().unwrap() += seconds;
        }
    }

    pub fn ops(&self) -> Vec<SinkOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn started_verses(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SinkOp::Start { verse_id, .. } => Some(verse_id),
                _ => None,
            })
            .collect()
    }

    pub fn last_started_token(&self) -> Option<u64> {
        *self.current_token.lock().unwrap()
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }
}

impl AudioSink for ManualSink {
    fn start(&self, clip: Arc<AudioClip>, rate: f64, token: u64) {
        self.ops.lock().unwrap().push(SinkOp::Start {
            verse_id: clip.verse_id.clone(),
            rate,
            token,
        });
        *self.current_token.lock().unwrap() = Some(token);
    }

    fn stop(&self) {
        self.ops.lock().unwrap().push(SinkOp::Stop);
        *self.current_token.lock().unwrap() = None;
    }

    fn suspend(&self) {
        self.ops.lock().unwrap().push(SinkOp::Suspend);
        *self.running.lock().unwrap() = false;
    }

    fn resume(&self) {
        self.ops.lock().unwrap().push(SinkOp::Resume);
        *self.running.lock().unwrap() = true;
    }

    fn set_rate(&self, rate: f64) {
        self.ops.lock().unwrap().push(SinkOp::SetRate(rate));
    }

    fn set_volume(&self, volume: f32) {
        self.ops.lock().unwrap().push(SinkOp::SetVolume(volume));
    }

    fn now(&self) -> f64 {
        *self.clock.lock().unwrap()
    }
}

/// Fully wired engine over scripted collaborators.
pub struct TestHarness {
    pub engine: Arc<PlayerEngine>,
    pub synth: Arc<ScriptedSynthesizer>,
    pub sink: Arc<ManualSink>,
    pub cache: Arc<ClipCache>,
    completion_tx: mpsc::UnboundedSender<CompletionEvent>,
}

pub fn harness(corpus: Arc<Corpus>) -> TestHarness {
    let synth = ScriptedSynthesizer::new();
    let cache = Arc::new(ClipCache::new(50));
    let navigator = Arc::new(Navigator::new(corpus));
    let fetcher = Arc::new(FetchCoordinator::new(
        Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>,
        Arc::new(StubDecoder::default()),
        Arc::clone(&cache),
        2,
        Duration::from_millis(2),
    ));
    let prefetcher = Prefetcher::new(Arc::clone(&fetcher), Arc::clone(&navigator), 2);

    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let sink = ManualSink::new();
    let state = Arc::new(SharedState::new(1.0));
    let engine = PlayerEngine::new(
        navigator,
        fetcher,
        prefetcher,
        Arc::clone(&sink) as Arc<dyn AudioSink>,
        state,
    );
    engine.spawn_completion_pump(completion_rx);

    TestHarness {
        engine,
        synth,
        sink,
        cache,
        completion_tx,
    }
}

impl TestHarness {
    /// Complete the currently sounding clip as the hardware would.
    pub fn complete_current(&self) {
        let token = self
            .sink
            .last_started_token()
            .expect("no clip is sounding");
        self.completion_tx
            .send(CompletionEvent { token })
            .expect("completion pump gone");
    }

    /// Send a completion for an arbitrary token (e.g. a stale one).
    pub fn complete_token(&self, token: u64) {
        self.completion_tx
            .send(CompletionEvent { token })
            .expect("completion pump gone");
    }
}

/// Await the first event matching `pred`, skipping others.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<LectioEvent>,
    pred: F,
) -> LectioEvent
where
    F: Fn(&LectioEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(e) => panic!("event channel error: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Await the `VerseStarted` event for one verse.
pub async fn wait_for_started(rx: &mut broadcast::Receiver<LectioEvent>, verse: &str) {
    let verse = verse.to_string();
    wait_for_event(rx, |event| {
        matches!(event, LectioEvent::VerseStarted { verse_id, .. } if *verse_id == verse)
    })
    .await;
}

/// Poll `cond` until it holds or a 5s deadline passes.
pub async fn wait_until<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Poll the engine until `verse_id` is the current verse (it may still be
/// loading).
pub async fn wait_for_current(engine: &Arc<PlayerEngine>, verse_id: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let current = engine.snapshot().await.current;
            if current.map(|c| c.verse_id == verse_id).unwrap_or(false) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for current verse");
}
