//! Lectio Verse Player (lectio-vp) - Main entry point
//!
//! Loads the corpus and player configuration, connects the speech synthesis
//! client and the audio device, then plays verses from the requested start
//! position until the corpus ends or the user interrupts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectio_common::corpus::Corpus;
use lectio_common::events::LectioEvent;
use lectio_vp::audio::decode::SymphoniaDecoder;
use lectio_vp::audio::output::CpalSink;
use lectio_vp::audio::sink::AudioSink;
use lectio_vp::config::PlayerConfig;
use lectio_vp::playback::cache::ClipCache;
use lectio_vp::playback::engine::PlayerEngine;
use lectio_vp::playback::fetch::FetchCoordinator;
use lectio_vp::playback::navigator::Navigator;
use lectio_vp::playback::prefetch::Prefetcher;
use lectio_vp::state::SharedState;
use lectio_vp::synth::HttpSynthesizer;

/// Command-line arguments for lectio-vp
#[derive(Parser, Debug)]
#[command(name = "lectio-vp")]
#[command(about = "Verse audio player for Lectio")]
#[command(version)]
struct Args {
    /// Corpus JSON file
    #[arg(short = 'C', long, env = "LECTIO_CORPUS")]
    corpus: PathBuf,

    /// Player configuration file (TOML)
    #[arg(short = 'c', long, env = "LECTIO_CONFIG")]
    config: Option<PathBuf>,

    /// Chapter to start from (defaults to the first chapter)
    #[arg(long)]
    chapter: Option<String>,

    /// Verse to start from (requires --chapter)
    #[arg(long)]
    verse: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectio_vp=debug,lectio_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = lectio_common::config::resolve_config_path(args.config.as_deref());
    let config = PlayerConfig::load_or_default(config_path.as_deref())
        .context("Failed to load player configuration")?;

    let corpus = Arc::new(
        Corpus::load(&args.corpus)
            .with_context(|| format!("Failed to load corpus from {}", args.corpus.display()))?,
    );
    info!(
        chapters = corpus.chapters.len(),
        verses = corpus.verse_count(),
        "Corpus loaded"
    );

    let navigator = Arc::new(Navigator::new(Arc::clone(&corpus)));
    let cache = Arc::new(ClipCache::new(config.cache.capacity));
    let synthesizer =
        Arc::new(HttpSynthesizer::new(&config.synthesis).context("Failed to build synthesis client")?);
    let fetcher = Arc::new(FetchCoordinator::new(
        synthesizer,
        Arc::new(SymphoniaDecoder),
        cache,
        config.synthesis.max_retries,
        Duration::from_millis(config.synthesis.retry_backoff_ms),
    ));
    let prefetcher = Prefetcher::new(
        Arc::clone(&fetcher),
        Arc::clone(&navigator),
        config.prefetch.lookahead,
    );

    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn AudioSink> = Arc::new(
        CpalSink::new(config.audio.device.clone(), completion_tx)
            .context("Failed to open audio output")?,
    );
    sink.set_volume(config.audio.volume);

    let state = Arc::new(SharedState::new(config.playback.rate));
    let engine = PlayerEngine::new(
        Arc::clone(&navigator),
        fetcher,
        prefetcher,
        sink,
        state,
    );
    engine.spawn_completion_pump(completion_rx);
    info!("Playback engine initialized");

    let start = match (args.chapter.as_deref(), args.verse.as_deref()) {
        (Some(chapter), Some(verse)) => navigator.position(chapter, verse),
        (Some(chapter), None) => navigator.first_of_chapter(chapter),
        (None, Some(_)) => anyhow::bail!("--verse requires --chapter"),
        (None, None) => navigator.first_verse(),
    }
    .context("Start position not found in corpus")?;

    let mut events = engine.subscribe_events();
    engine
        .play(&start.chapter_id, &start.verse.id)
        .await
        .context("Failed to start playback")?;

    // Follow events until the corpus ends or the user interrupts.
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                engine.stop().await;
                break;
            }
            event = events.recv() => match event {
                Ok(LectioEvent::PlaybackStopped { .. }) => {
                    info!("Playback finished");
                    break;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
