//! Player configuration
//!
//! Loaded from TOML. Every section has defaults, so a missing file or a
//! partial file still yields a runnable configuration.

use crate::error::{Error, Result};
use crate::playback::engine::{RATE_MAX, RATE_MIN};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level player configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub synthesis: SynthesisConfig,
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
    pub audio: AudioConfig,
    pub playback: PlaybackConfig,
}

/// Speech synthesis service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Service endpoint receiving `{ "text": ..., "voice": ... }` and
    /// returning encoded audio bytes
    pub endpoint: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Voice preset passed through to the service
    pub voice: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Initial retry backoff in milliseconds (doubles per retry)
    pub retry_backoff_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:7750/synthesize".to_string(),
            api_key: None,
            voice: None,
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 1000,
        }
    }
}

/// Clip cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of decoded clips held in memory. Bounds memory, not
    /// derived from corpus size.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Lookahead prefetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// How many verses past the playhead to warm
    pub lookahead: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { lookahead: 2 }
    }
}

/// Audio output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,
    /// Master volume (0.0-1.0)
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            volume: 0.75,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial playback rate, within the same bounds as live rate changes
    pub rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl PlayerConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: PlayerConfig = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(Error::Config("cache.capacity must be at least 1".to_string()));
        }
        if !(RATE_MIN..=RATE_MAX).contains(&self.playback.rate) {
            return Err(Error::Config(format!(
                "playback.rate must be within {}-{}",
                RATE_MIN, RATE_MAX
            )));
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(Error::Config("audio.volume must be within 0.0-1.0".to_string()));
        }
        Ok(())
    }
}
