//! # Lectio Verse Player (lectio-vp)
//!
//! Sequential verse audio playback engine for the Lectio reading companion.
//!
//! **Purpose:** Turn an ordered corpus of verses into continuous, gapless
//! spoken audio: clips are synthesized on demand by a remote service,
//! decoded, cached under a bounded LRU budget, prefetched two verses ahead
//! of the playhead, and chained without gaps on natural completion.
//!
//! **Architecture:** tokio tasks around an injected `AudioSink`; a monotonic
//! playback epoch discards the results of superseded async work. Timing for
//! word highlighting is a pull model: one `ClipTiming` snapshot per started
//! clip plus the sink's shared pausable clock.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;
pub mod synth;

pub use error::{Error, Result};
pub use playback::PlayerEngine;
pub use state::SharedState;
