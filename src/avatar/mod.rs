//! Avatar Front-end Bridge
//!
//! Pushes state to the remote avatar front-end (model selection,
//! expressions, speaking signals, transcript text) over the broadcast
//! route, and reads viewer microphone audio back over a WebSocket. One
//! `AvatarBridge` is one session context: the selected model, its emotion
//! map, and the expression dispatch worker all live on it, not in process
//! globals.

pub mod broadcast;
pub mod expression;
pub mod mic;
pub mod model;

// Re-export main types
pub use broadcast::{BroadcastEvent, Broadcaster, ControlSignal};
pub use expression::{EmotionLexicon, ExpressionDispatcher, ExpressionTask};
pub use model::{EmotionMap, ExpressionId, ModelDescriptor};

use crate::config::Config;
use crate::error::{StageError, StageResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Session context for one connected front-end
#[derive(Debug)]
pub struct AvatarBridge {
    model: ModelDescriptor,
    lexicon: EmotionLexicon,
    broadcaster: Arc<Broadcaster>,
    dispatcher: ExpressionDispatcher,
    capture_url: String,
}

impl AvatarBridge {
    /// Build a bridge for an already-selected model.
    ///
    /// Must be called from within a tokio runtime (the expression worker
    /// is spawned here).
    pub fn new(model: ModelDescriptor, base_url: &str) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(base_url));
        let lexicon = EmotionLexicon::new(model.emotion_map.clone());
        let dispatcher = ExpressionDispatcher::spawn(broadcaster.clone());
        let capture_url = mic::ws_capture_url(base_url);

        Self {
            model,
            lexicon,
            broadcaster,
            dispatcher,
            capture_url,
        }
    }

    /// Point microphone capture at a non-default endpoint (e.g. a dev
    /// proxy serving the socket on another port)
    pub fn with_capture_url(mut self, url: impl Into<String>) -> Self {
        self.capture_url = url.into();
        self
    }

    /// Load the model dictionary, select the configured model, and
    /// announce it to the front-end.
    ///
    /// An unknown model name comes back as the unrecoverable
    /// `ModelNotFound` kind; the composition root decides what to do with
    /// the process.
    pub async fn connect(config: &Config) -> StageResult<Self> {
        let models = model::load_model_dict(Path::new(&config.model_dict_path))?;
        let selected = model::select_model(&models, &config.avatar_model, &config.base_url)?;

        let bridge = Self::new(selected, &config.base_url);
        bridge
            .broadcaster
            .send(&BroadcastEvent::SetModel(bridge.model.clone()))
            .await;

        Ok(bridge)
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    /// Set an expression immediately, bypassing the queue.
    ///
    /// Unknown keys are a recoverable lookup error.
    pub async fn set_expression(&self, key: &str) -> StageResult<()> {
        let id = self
            .lexicon
            .id_for(key)
            .ok_or_else(|| StageError::ExpressionNotFound(key.to_string()))?
            .clone();

        info!("Setting expression '{}' -> {}", key, id);
        self.broadcaster
            .send(&BroadcastEvent::Expression(id))
            .await;
        Ok(())
    }

    /// Queue one expression change per distinct emotion marker found in
    /// the text, in map order. The worker fires each change and holds
    /// `delay` before the next, throttling visual churn.
    pub fn queue_expressions_from_text(&self, text: &str, delay: Duration) {
        for (key, id) in self.lexicon.entries_found_in(text) {
            debug!("Queueing expression '{}' -> {}", key, id);
            self.dispatcher.enqueue(ExpressionTask {
                id: id.clone(),
                delay,
            });
        }
    }

    /// Identifiers for every distinct emotion marker in the text
    pub fn extract_expression_ids(&self, text: &str) -> Vec<ExpressionId> {
        self.lexicon.ids_found_in(text)
    }

    /// Text with every emotion marker removed
    pub fn strip_expression_markers(&self, text: &str) -> String {
        self.lexicon.strip_markers(text)
    }

    /// Marker listing for an upstream text generator's prompt
    pub fn emotion_key_listing(&self) -> String {
        self.lexicon.key_listing()
    }

    pub async fn start_speaking(&self) {
        self.broadcaster
            .send(&BroadcastEvent::Control(ControlSignal::SpeakingStart))
            .await;
    }

    pub async fn stop_speaking(&self) {
        self.broadcaster
            .send(&BroadcastEvent::Control(ControlSignal::SpeakingStop))
            .await;
    }

    /// Push transcript text for display
    pub async fn send_text(&self, text: &str) {
        self.broadcaster
            .send(&BroadcastEvent::FullText(text.to_string()))
            .await;
    }

    /// Block until the front-end delivers one microphone session.
    ///
    /// See [`mic::capture`] for the protocol details.
    pub async fn capture_mic_audio(&self) -> StageResult<Vec<f32>> {
        mic::capture(&self.capture_url)
            .await
            .map_err(|e| StageError::FrontEnd(e.to_string()))
    }
}
