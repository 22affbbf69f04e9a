//! Audio clip types, decoding, and output

pub mod clip;
pub mod decode;
pub mod output;
pub mod sink;

pub use clip::AudioClip;
pub use decode::{ClipDecoder, SymphoniaDecoder};
pub use output::CpalSink;
pub use sink::{AudioSink, CompletionEvent};
