//! ASR (Automatic Speech Recognition) Module
//!
//! Thin adapter over an external pretrained multi-function speech model.
//! The model handles acoustic modeling, voice-activity detection and
//! punctuation internally; this module forwards audio, applies tag
//! stripping to the raw output, and exposes the `Transcriber` seam.

pub mod remote;
pub mod tags;

use crate::audio::{self, EnergyGate};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

// Re-export main types
pub use remote::RemoteAsr;
pub use tags::TagStripper;

/// Trait for transcription engines
///
/// One utterance of mono f32 PCM at the configured sample rate in, cleaned
/// text out. Implementations are not required to be safe for concurrent
/// calls; callers serialize access to a single instance.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, samples: &[f32]) -> Result<String>;
}

/// Alternate call path: transcribe from the local microphone.
///
/// Collects one energy-gated utterance from the capture stream and runs it
/// through the engine. Post-processing is identical to the batch path since
/// it happens inside the engine.
pub async fn transcribe_from_mic(
    engine: &dyn Transcriber,
    chunks: &mut UnboundedReceiver<Vec<f32>>,
    gate: &EnergyGate,
) -> Result<String> {
    let samples = audio::collect_utterance(chunks, gate).await?;
    engine.transcribe(&samples).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct EchoLength;

    #[async_trait]
    impl Transcriber for EchoLength {
        async fn transcribe(&self, samples: &[f32]) -> Result<String> {
            Ok(format!("{} samples", samples.len()))
        }
    }

    #[tokio::test]
    async fn test_transcribe_from_mic_gates_on_energy() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // quiet lead-in, then speech, then silence to close the utterance
        tx.send(vec![0.0f32; 4]).unwrap();
        tx.send(vec![0.5f32; 4]).unwrap();
        tx.send(vec![0.0f32; 4]).unwrap();
        tx.send(vec![0.0f32; 4]).unwrap();
        drop(tx);

        let gate = EnergyGate {
            threshold: 0.1,
            silence_chunks: 2,
        };
        let text = transcribe_from_mic(&EchoLength, &mut rx, &gate)
            .await
            .unwrap();
        // the loud chunk plus the silence run that ended the utterance
        assert_eq!(text, "12 samples");
    }
}
