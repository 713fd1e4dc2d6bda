//! Session Composition
//!
//! Wires the front-end bridge and the transcription adapter into the
//! listen → transcribe → display loop. The bridge and the adapter never
//! call each other directly; this is the only place they meet.

use crate::asr::{self, Transcriber};
use crate::audio::EnergyGate;
use crate::avatar::AvatarBridge;
use crate::error::StageResult;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

pub struct Session {
    bridge: AvatarBridge,
    transcriber: Box<dyn Transcriber>,
    expression_delay: Duration,
}

impl Session {
    pub fn new(
        bridge: AvatarBridge,
        transcriber: Box<dyn Transcriber>,
        expression_delay: Duration,
    ) -> Self {
        Self {
            bridge,
            transcriber,
            expression_delay,
        }
    }

    pub fn bridge(&self) -> &AvatarBridge {
        &self.bridge
    }

    /// One turn against the front-end microphone: capture a session's
    /// audio, transcribe it, and deliver the result. Returns the
    /// displayed text, or None when the capture session carried no audio.
    pub async fn run_turn(&self) -> StageResult<Option<String>> {
        let samples = self.bridge.capture_mic_audio().await?;
        if samples.is_empty() {
            debug!("Empty capture session, nothing to transcribe");
            return Ok(None);
        }

        info!("🎙️ Captured {} samples from the front-end", samples.len());
        let raw = self.transcriber.transcribe(&samples).await?;

        Ok(Some(self.deliver(&raw).await))
    }

    /// One turn against the local microphone: collect one energy-gated
    /// utterance from the capture stream instead of the front-end socket.
    pub async fn run_local_turn(
        &self,
        chunks: &mut UnboundedReceiver<Vec<f32>>,
        gate: &EnergyGate,
    ) -> StageResult<String> {
        let raw = asr::transcribe_from_mic(self.transcriber.as_ref(), chunks, gate).await?;
        Ok(self.deliver(&raw).await)
    }

    /// Push one transcript to the front-end: expressions from the raw
    /// text go on the dispatch queue, the marker-stripped text is shown,
    /// and the whole delivery is wrapped in speaking signals.
    async fn deliver(&self, raw: &str) -> String {
        let display = self.bridge.strip_expression_markers(raw).trim().to_string();

        self.bridge.start_speaking().await;
        self.bridge
            .queue_expressions_from_text(raw, self.expression_delay);
        self.bridge.send_text(&display).await;
        self.bridge.stop_speaking().await;

        display
    }
}
