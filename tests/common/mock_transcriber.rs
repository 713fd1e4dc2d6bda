//! Mock Transcriber for Testing
//!
//! Returns a fixed phrase and records the sample counts it was handed.

use anyhow::Result;
use async_trait::async_trait;
use stagelink::asr::Transcriber;
use std::sync::{Arc, Mutex};

pub struct MockTranscriber {
    phrase: String,
    /// Sample count of every call, shared for later inspection
    pub received: Arc<Mutex<Vec<usize>>>,
}

impl MockTranscriber {
    pub fn with_phrase(phrase: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn received_handle(&self) -> Arc<Mutex<Vec<usize>>> {
        self.received.clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, samples: &[f32]) -> Result<String> {
        self.received.lock().unwrap().push(samples.len());
        Ok(self.phrase.clone())
    }
}
