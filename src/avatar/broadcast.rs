//! Broadcast Transport
//!
//! All front-end state changes go through one HTTP call: a POST to the
//! `/broadcast` route with the event serialized to a JSON string and
//! wrapped as `{"message": <string>}` (the front-end relays the inner
//! string to every connected viewer verbatim). Delivery is best-effort:
//! the response status is only logged, never raised.

use crate::avatar::model::{ExpressionId, ModelDescriptor};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Events understood by the front-end, serialized as `{type, text}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text")]
pub enum BroadcastEvent {
    /// Switch the displayed model; carries the full descriptor
    #[serde(rename = "set-model")]
    SetModel(ModelDescriptor),

    /// Set a facial expression by front-end identifier
    #[serde(rename = "expression")]
    Expression(ExpressionId),

    /// Speaking start/stop signal
    #[serde(rename = "control")]
    Control(ControlSignal),

    /// Full transcript text for display
    #[serde(rename = "full-text")]
    FullText(String),
}

/// Control signal values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlSignal {
    #[serde(rename = "speaking-start")]
    SpeakingStart,
    #[serde(rename = "speaking-stop")]
    SpeakingStop,
}

/// Fire-and-forget sender for broadcast events
#[derive(Debug)]
pub struct Broadcaster {
    client: Client,
    endpoint: String,
}

impl Broadcaster {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/broadcast", base_url.trim_end_matches('/')),
        }
    }

    /// Send one event to every connected viewer.
    ///
    /// Delivery is best-effort: failures (serialization, transport,
    /// non-2xx status) are logged and swallowed, never raised.
    pub async fn send(&self, event: &BroadcastEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize broadcast event: {}", e);
                return;
            }
        };

        let body = serde_json::json!({ "message": payload });

        match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("Broadcast delivered ({})", resp.status());
            }
            Ok(resp) => {
                warn!("Broadcast rejected with HTTP {}", resp.status());
            }
            Err(e) => {
                warn!("Broadcast failed: {}", e);
            }
        }
    }
}
