//! Audio output using cpal
//!
//! Manages audio device output with callback-based playback. The
//! `cpal::Stream` is not `Send`, so it lives on a dedicated audio thread
//! driven by a small command channel; everything the callback needs is
//! shared through `Arc`.
//!
//! The shared clock counts frames actually rendered by the device
//! (seconds = frames / device rate). Suspending the stream stops the
//! callbacks, which freezes the clock without any extra bookkeeping.

use crate::audio::clip::AudioClip;
use crate::audio::sink::{AudioSink, CompletionEvent};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Clip currently being rendered by the callback.
struct Voice {
    clip: Arc<AudioClip>,
    /// Fractional sample position within the clip
    position: f64,
    token: u64,
}

/// State shared between the control side and the audio callback.
struct Shared {
    voice: Mutex<Option<Voice>>,
    rate: Mutex<f64>,
    volume: Mutex<f32>,
    /// Total frames rendered by the device; the shared clock basis
    frames_rendered: AtomicU64,
    completion_tx: mpsc::UnboundedSender<CompletionEvent>,
}

enum SinkCommand {
    Suspend,
    Resume,
    Shutdown,
}

/// cpal-backed audio sink.
pub struct CpalSink {
    shared: Arc<Shared>,
    device_rate: u32,
    control_tx: std::sync::mpsc::Sender<SinkCommand>,
}

impl CpalSink {
    /// Open the output device (default device when `device_name` is None,
    /// with fallback to the default when a named device is missing) and
    /// start the stream with the clock running.
    pub fn new(
        device_name: Option<String>,
        completion_tx: mpsc::UnboundedSender<CompletionEvent>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            voice: Mutex::new(None),
            rate: Mutex::new(1.0),
            volume: Mutex::new(0.75),
            frames_rendered: AtomicU64::new(0),
            completion_tx,
        });

        let (control_tx, control_rx) = std::sync::mpsc::channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let thread_shared = Arc::clone(&shared);

        std::thread::Builder::new()
            .name("lectio-audio".to_string())
            .spawn(move || stream_thread(device_name, thread_shared, control_rx, ready_tx))
            .map_err(|e| Error::AudioOutput(format!("failed to spawn audio thread: {}", e)))?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("audio thread exited during setup".to_string()))??;

        info!(device_rate, "Audio output ready");
        Ok(Self {
            shared,
            device_rate,
            control_tx,
        })
    }

    /// Device sample rate in Hz.
    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl AudioSink for CpalSink {
    fn start(&self, clip: Arc<AudioClip>, rate: f64, token: u64) {
        *self.shared.rate.lock().unwrap() = rate;
        let mut voice = self.shared.voice.lock().unwrap();
        *voice = Some(Voice {
            clip,
            position: 0.0,
            token,
        });
    }

    fn stop(&self) {
        *self.shared.voice.lock().unwrap() = None;
    }

    fn suspend(&self) {
        let _ = self.control_tx.send(SinkCommand::Suspend);
    }

    fn resume(&self) {
        let _ = self.control_tx.send(SinkCommand::Resume);
    }

    fn set_rate(&self, rate: f64) {
        *self.shared.rate.lock().unwrap() = rate;
    }

    fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.shared.volume.lock().unwrap() = clamped;
        debug!("Volume set to {:.2}", clamped);
    }

    fn now(&self) -> f64 {
        self.shared.frames_rendered.load(Ordering::Relaxed) as f64 / self.device_rate as f64
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.control_tx.send(SinkCommand::Shutdown);
    }
}

/// Audio thread body: owns the stream, applies suspend/resume commands.
fn stream_thread(
    device_name: Option<String>,
    shared: Arc<Shared>,
    control_rx: std::sync::mpsc::Receiver<SinkCommand>,
    ready_tx: std::sync::mpsc::Sender<Result<u32>>,
) {
    let (stream, device_rate) = match build_stream(device_name, &shared) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(Error::AudioOutput(format!(
            "failed to start stream: {}",
            e
        ))));
        return;
    }
    let _ = ready_tx.send(Ok(device_rate));

    while let Ok(command) = control_rx.recv() {
        match command {
            SinkCommand::Suspend => {
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause stream: {}", e);
                }
            }
            SinkCommand::Resume => {
                if let Err(e) = stream.play() {
                    warn!("Failed to resume stream: {}", e);
                }
            }
            SinkCommand::Shutdown => break,
        }
    }
    debug!("Audio thread exiting");
}

fn build_stream(
    device_name: Option<String>,
    shared: &Arc<Shared>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();

    // Try to get the requested device, with fallback to default
    let device = match device_name.as_ref() {
        Some(name) => {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("failed to enumerate devices: {}", e)))?;
            match devices.find(|d| d.name().ok().as_deref() == Some(name.as_str())) {
                Some(device) => {
                    info!("Found requested audio device: {}", name);
                    device
                }
                None => {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        name
                    );
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput(format!(
                            "device '{}' not found and no default device available",
                            name
                        ))
                    })?
                }
            }
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("no default output device found".to_string()))?,
    };

    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("failed to get device config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let device_rate = config.sample_rate.0;
    let channels = config.channels as usize;

    debug!(
        sample_rate = device_rate,
        channels,
        ?sample_format,
        "Audio output config"
    );

    let err_fn = |err| error!("Audio stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => {
            let shared = Arc::clone(shared);
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        render(&shared, device_rate, data.chunks_mut(channels), |out, sample| {
                            for slot in out.iter_mut() {
                                *slot = sample;
                            }
                        });
                        shared
                            .frames_rendered
                            .fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?
        }
        SampleFormat::I16 => {
            let shared = Arc::clone(shared);
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        render(&shared, device_rate, data.chunks_mut(channels), |out, sample| {
                            let value = (sample * i16::MAX as f32) as i16;
                            for slot in out.iter_mut() {
                                *slot = value;
                            }
                        });
                        shared
                            .frames_rendered
                            .fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?
        }
        other => {
            return Err(Error::AudioOutput(format!(
                "unsupported sample format: {:?}",
                other
            )));
        }
    };

    Ok((stream, device_rate))
}

/// Fill one callback buffer from the sounding voice, then report natural
/// completion once the clip is exhausted.
fn render<'a, T, I, W>(shared: &Shared, device_rate: u32, frames: I, mut write: W)
where
    T: 'a,
    I: Iterator<Item = &'a mut [T]>,
    W: FnMut(&mut [T], f32),
{
    let volume = *shared.volume.lock().unwrap();
    let rate = *shared.rate.lock().unwrap();
    let mut voice = shared.voice.lock().unwrap();

    for frame in frames {
        let sample = match voice.as_mut() {
            Some(active) => {
                let sample = sample_at(&active.clip, active.position);
                active.position += rate * active.clip.sample_rate as f64 / device_rate as f64;
                sample
            }
            None => 0.0,
        };
        write(frame, (sample * volume).clamp(-1.0, 1.0));
    }

    let finished = voice
        .as_ref()
        .map(|active| active.position >= active.clip.samples.len() as f64)
        .unwrap_or(false);
    if finished {
        if let Some(active) = voice.take() {
            let _ = shared.completion_tx.send(CompletionEvent {
                token: active.token,
            });
        }
    }
}

/// Linear-interpolated sample lookup.
fn sample_at(clip: &AudioClip, position: f64) -> f32 {
    let idx = position as usize;
    if idx + 1 < clip.samples.len() {
        let frac = (position - idx as f64) as f32;
        clip.samples[idx] * (1.0 - frac) + clip.samples[idx + 1] * frac
    } else if idx < clip.samples.len() {
        clip.samples[idx]
    } else {
        0.0
    }
}
