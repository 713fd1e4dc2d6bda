//! Remote Inference Client
//!
//! Talks to the external pretrained speech model service. The protocol is
//! JSON lines over TCP: one `transcribe` request event carrying the audio
//! and the fixed inference options, answered by a `transcript` event. The
//! model does everything heavy (acoustic modeling, VAD, punctuation); this
//! client only moves bytes and cleans the returned text.

use crate::asr::tags::TagStripper;
use crate::asr::Transcriber;
use crate::config::Config;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Seconds of audio the model may batch per inference call
const BATCH_WINDOW_S: u32 = 300;

/// How long to wait for a transcript before giving up on the connection
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Inference protocol events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InferenceEvent {
    /// Transcription request with audio and inference options
    #[serde(rename = "transcribe")]
    Transcribe(TranscribeRequest),

    /// Transcript result
    #[serde(rename = "transcript")]
    Transcript(TranscriptData),
}

/// Transcription request data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeRequest {
    pub rate: u32,
    pub language: String,
    pub use_itn: bool,
    pub batch_window_s: u32,
    #[serde(with = "base64_bytes")]
    pub audio: Vec<u8>,
}

/// Transcript result data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptData {
    pub text: String,
}

/// Base64 serialization for audio bytes
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Client for the external speech model service
pub struct RemoteAsr {
    host: String,
    port: u16,
    sample_rate: u32,
    language: String,
    use_itn: bool,
    stripper: TagStripper,
}

impl RemoteAsr {
    /// Create a client from the application config
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.asr_host.clone(),
            port: config.asr_port,
            sample_rate: config.sample_rate,
            language: config.asr_language.clone(),
            use_itn: config.asr_use_itn,
            stripper: TagStripper::new(),
        }
    }

    /// Replace the default tag stripper, e.g. to cover extra tag grammars
    pub fn with_stripper(mut self, stripper: TagStripper) -> Self {
        self.stripper = stripper;
        self
    }

    /// Check if the inference service is reachable
    pub async fn health_check(&self) -> bool {
        match TcpStream::connect((&*self.host, self.port)).await {
            Ok(_) => {
                debug!("inference service available at {}:{}", self.host, self.port);
                true
            }
            Err(e) => {
                warn!("inference service not available: {}", e);
                false
            }
        }
    }

    /// Send one utterance to the model and wait for the raw transcript
    async fn request_transcript(&self, samples: &[f32]) -> Result<String> {
        let stream = TcpStream::connect((&*self.host, self.port))
            .await
            .context("Failed to connect to inference service")?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let request = InferenceEvent::Transcribe(TranscribeRequest {
            rate: self.sample_rate,
            language: self.language.clone(),
            use_itn: self.use_itn,
            batch_window_s: BATCH_WINDOW_S,
            audio: samples_to_pcm16(samples),
        });

        let line = serde_json::to_string(&request)?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        debug!(
            "Sent {} samples, waiting for transcript...",
            samples.len()
        );

        let transcript = tokio::time::timeout(RESPONSE_TIMEOUT, async {
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await? == 0 {
                    anyhow::bail!("inference service closed the connection before replying");
                }

                match serde_json::from_str::<InferenceEvent>(&line) {
                    Ok(InferenceEvent::Transcript(data)) => return Ok(data.text),
                    Ok(other) => debug!("ignoring unexpected event: {:?}", other),
                    Err(e) => warn!("unparseable line from inference service: {}", e),
                }
            }
        })
        .await
        .context("Timeout waiting for transcript")??;

        Ok(transcript)
    }
}

#[async_trait::async_trait]
impl Transcriber for RemoteAsr {
    async fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let raw = self.request_transcript(samples).await?;
        Ok(self.stripper.strip(&raw))
    }
}

/// Convert mono f32 samples to little-endian 16-bit PCM bytes
fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&clamped.to_le_bytes());
    }
    bytes
}
