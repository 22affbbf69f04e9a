//! Decoded audio clips

/// Immutable decoded audio for one verse.
///
/// Created by the decoder on first fetch, owned by the clip cache, and
/// shared by `Arc` with the scheduler while sounding. The scheduler's
/// reference is independent of the cache, so eviction never cuts a sounding
/// clip short; it only affects future lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub verse_id: String,
    /// Mono f32 samples at `sample_rate`
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_seconds: f64,
}

impl AudioClip {
    pub fn new(verse_id: impl Into<String>, samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_seconds = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / sample_rate as f64
        };
        Self {
            verse_id: verse_id.into(),
            samples,
            sample_rate,
            duration_seconds,
        }
    }
}
