//! Front-end Microphone Capture
//!
//! The front-end records the viewer's microphone and streams sample chunks
//! back over a WebSocket. Capture is a blocking affair from the caller's
//! point of view: connect, accumulate until the front-end signals the end
//! of the stream (or disconnects), return the buffer. There is no timeout;
//! a silent front-end hangs the call, and callers who care wrap it in one.

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Messages the front-end sends on the capture socket
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum FrontendMessage {
    #[serde(rename = "mic-audio")]
    MicAudio { audio: AudioPayload },

    #[serde(rename = "mic-audio-end")]
    MicAudioEnd,

    #[serde(other)]
    Other,
}

/// A chunk of f32 samples, either as an ordered array (preferred) or the
/// legacy index→value mapping
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudioPayload {
    Samples(Vec<f32>),
    Indexed(HashMap<String, f32>),
}

impl AudioPayload {
    /// Flatten to an ordered sample vector. The mapping form is
    /// reconstructed by numeric index, not map iteration order.
    fn into_samples(self) -> Vec<f32> {
        match self {
            AudioPayload::Samples(samples) => samples,
            AudioPayload::Indexed(map) => {
                let mut indexed: Vec<(usize, f32)> = map
                    .into_iter()
                    .filter_map(|(key, value)| match key.parse::<usize>() {
                        Ok(index) => Some((index, value)),
                        Err(_) => {
                            warn!("Dropping sample with non-numeric index '{}'", key);
                            None
                        }
                    })
                    .collect();
                indexed.sort_unstable_by_key(|(index, _)| *index);
                indexed.into_iter().map(|(_, value)| value).collect()
            }
        }
    }
}

/// Capture endpoint for a front-end base URL, e.g.
/// `http://127.0.0.1:8000` → `ws://127.0.0.1:8000/server-ws`
pub fn ws_capture_url(base_url: &str) -> String {
    let host = base_url
        .split("//")
        .nth(1)
        .unwrap_or(base_url)
        .trim_end_matches('/');
    format!("ws://{}/server-ws", host)
}

/// Collect one capture session's worth of audio.
///
/// Blocks until the front-end sends `mic-audio-end` or closes the
/// connection. The buffer is local to this call, so every session starts
/// empty and the result is handed back by value.
pub async fn capture(ws_url: &str) -> Result<Vec<f32>> {
    let (mut ws, _) = connect_async(ws_url)
        .await
        .with_context(|| format!("Failed to connect to front-end capture socket at {}", ws_url))?;

    info!("Waiting for audio data from the front-end...");

    let mut buffer: Vec<f32> = Vec::new();

    while let Some(message) = ws.next().await {
        let message = message.context("Front-end capture socket error")?;
        match message {
            Message::Text(text) => match serde_json::from_str::<FrontendMessage>(&text) {
                Ok(FrontendMessage::MicAudio { audio }) => {
                    let samples = audio.into_samples();
                    debug!("Received {} samples", samples.len());
                    buffer.extend_from_slice(&samples);
                }
                Ok(FrontendMessage::MicAudioEnd) => {
                    debug!("Front-end signalled end of audio");
                    break;
                }
                Ok(FrontendMessage::Other) => {}
                Err(e) => warn!("Unrecognized front-end message: {}", e),
            },
            Message::Close(_) => {
                debug!("Front-end closed the capture socket");
                break;
            }
            _ => {}
        }
    }

    info!("Capture session ended with {} samples", buffer.len());
    Ok(buffer)
}
