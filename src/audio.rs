//! Local microphone capture using cpal
//!
//! Produces mono f32 chunks over a channel, plus a simple RMS energy gate
//! used to cut one utterance out of the stream.

use crate::config::Config;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 1024;

/// Start audio capture and return a receiver for audio chunks
pub fn start_capture(
    sample_rate: u32,
    device_index: Option<usize>,
) -> Result<UnboundedReceiver<Vec<f32>>> {
    let host = cpal::default_host();

    // List available devices
    info!("Available audio input devices:");
    for (i, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let marker = if device_index == Some(i) { "*" } else { " " };
        info!("  {} [{}] {}", marker, i, name);
    }

    // Select device
    let device = if let Some(idx) = device_index {
        host.input_devices()?
            .nth(idx)
            .context("Device index out of range")?
    } else {
        host.default_input_device()
            .context("No default input device")?
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    // Configure stream
    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Fixed(CHUNK_SIZE as u32),
    };

    let (tx, rx): (UnboundedSender<Vec<f32>>, UnboundedReceiver<Vec<f32>>) =
        mpsc::unbounded_channel();

    // Build input stream
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if tx.send(data.to_vec()).is_err() {
                warn!("Audio receiver dropped");
            }
        },
        |err| {
            warn!("Audio stream error: {}", err);
        },
        None,
    )?;

    stream.play()?;

    // The stream runs for the life of the process; leak the handle to
    // keep it alive.
    std::mem::forget(stream);

    Ok(rx)
}

/// RMS energy of a chunk, used as the speech/silence measure
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f32 = samples.iter().map(|&s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Energy-gate settings for utterance collection
#[derive(Debug, Clone)]
pub struct EnergyGate {
    /// Chunks below this RMS energy count as silence
    pub threshold: f32,
    /// Consecutive quiet chunks that end an utterance
    pub silence_chunks: usize,
}

impl EnergyGate {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold: config.vad_energy_threshold,
            silence_chunks: config.vad_silence_chunks,
        }
    }
}

/// Collect one utterance from the capture stream.
///
/// Quiet chunks before speech onset are discarded; once a chunk crosses the
/// threshold, chunks are accumulated until `silence_chunks` consecutive
/// quiet ones arrive (the trailing silence is kept, the model's own VAD
/// deals with it).
pub async fn collect_utterance(
    chunks: &mut UnboundedReceiver<Vec<f32>>,
    gate: &EnergyGate,
) -> Result<Vec<f32>> {
    let mut utterance: Vec<f32> = Vec::new();
    let mut quiet_run = 0usize;

    while let Some(chunk) = chunks.recv().await {
        let energy = calculate_energy(&chunk);

        if utterance.is_empty() {
            if energy < gate.threshold {
                continue;
            }
            debug!("Speech onset (energy {:.4})", energy);
        }

        utterance.extend_from_slice(&chunk);

        if energy < gate.threshold {
            quiet_run += 1;
            if quiet_run >= gate.silence_chunks {
                debug!("Utterance ended after {} samples", utterance.len());
                break;
            }
        } else {
            quiet_run = 0;
        }
    }

    if utterance.is_empty() {
        anyhow::bail!("microphone stream ended before any speech was captured");
    }

    Ok(utterance)
}
