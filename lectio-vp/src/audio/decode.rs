//! Audio decoding using symphonia
//!
//! Turns the encoded bytes returned by the synthesis service into a decoded
//! `AudioClip` with a known duration. Decoding is pure and synchronous;
//! failures surface as `Error::Decode` and are folded into the "no clip"
//! outcome by the fetch coordinator, indistinguishable from a synthesis
//! failure above that boundary.
//!
//! # Supported Formats
//!
//! Per Cargo.toml symphonia features: WAV/PCM, MP3, FLAC.
//!
//! # Sample Format
//!
//! Output is mono f32 at the payload's native sample rate. Spoken-word
//! synthesis payloads are mono in practice; multi-channel payloads are
//! downmixed by averaging.

use crate::audio::clip::AudioClip;
use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoder seam between the synthesis payload and the playable clip.
pub trait ClipDecoder: Send + Sync {
    /// Decode encoded audio bytes into a clip for `verse_id`.
    fn decode(&self, verse_id: &str, bytes: &[u8]) -> Result<AudioClip>;
}

/// Symphonia-backed decoder.
pub struct SymphoniaDecoder;

impl ClipDecoder for SymphoniaDecoder {
    fn decode(&self, verse_id: &str, bytes: &[u8]) -> Result<AudioClip> {
        let cursor = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        // Probe format (no filename hint; the payload is a bare byte stream)
        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("unrecognized audio payload: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| Error::Decode("no audio track in payload".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("payload missing sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("unsupported codec: {}", e)))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break; // EOF
                }
                Err(e) => return Err(Error::Decode(format!("packet read failed: {}", e))),
            };

            // Skip packets from other tracks
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| Error::Decode(format!("decode failed: {}", e)))?;
            append_mono(&decoded, &mut samples)?;
        }

        if samples.is_empty() {
            return Err(Error::Decode("payload decoded to zero samples".to_string()));
        }

        Ok(AudioClip::new(verse_id, samples, sample_rate))
    }
}

/// Downmix a decoded buffer to mono f32 and append to `out`.
fn append_mono(buffer: &AudioBufferRef, out: &mut Vec<f32>) -> Result<()> {
    match buffer {
        AudioBufferRef::F32(buf) => {
            let channels = buf.spec().channels.count();
            let frames = buf.frames();
            if channels == 1 {
                out.extend_from_slice(buf.chan(0));
            } else {
                for frame_idx in 0..frames {
                    let mut acc = 0.0f32;
                    for ch in 0..channels {
                        acc += buf.chan(ch)[frame_idx];
                    }
                    out.push(acc / channels as f32);
                }
            }
            Ok(())
        }
        AudioBufferRef::S16(buf) => {
            let channels = buf.spec().channels.count();
            let frames = buf.frames();
            for frame_idx in 0..frames {
                let mut acc = 0.0f32;
                for ch in 0..channels {
                    acc += buf.chan(ch)[frame_idx] as f32 / i16::MAX as f32;
                }
                out.push(acc / channels as f32);
            }
            Ok(())
        }
        AudioBufferRef::S32(buf) => {
            let channels = buf.spec().channels.count();
            let frames = buf.frames();
            for frame_idx in 0..frames {
                let mut acc = 0.0f32;
                for ch in 0..channels {
                    acc += buf.chan(ch)[frame_idx] as f32 / i32::MAX as f32;
                }
                out.push(acc / channels as f32);
            }
            Ok(())
        }
        _ => Err(Error::Decode(
            "unsupported sample format in payload".to_string(),
        )),
    }
}
