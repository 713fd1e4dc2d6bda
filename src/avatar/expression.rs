//! Expression Scanning and Dispatch
//!
//! Generated text carries emotion markers like `[joy]`. The lexicon scans
//! for markers from the active model's emotion map, strips them for
//! display, and the dispatcher plays the matched expressions back to the
//! front-end one at a time so rapid-fire changes don't flood it.

use crate::avatar::broadcast::{BroadcastEvent, Broadcaster};
use crate::avatar::model::{EmotionMap, ExpressionId};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

/// Marker scanner built from one model's emotion map.
///
/// Keys are lowercase; scanning is case-insensitive and walks the map in
/// its (sorted) iteration order.
#[derive(Debug)]
pub struct EmotionLexicon {
    map: EmotionMap,
    // Single alternation over every `[key]`, case-insensitive. None when
    // the map is empty.
    markers: Option<Regex>,
}

impl EmotionLexicon {
    pub fn new(map: EmotionMap) -> Self {
        let markers = if map.is_empty() {
            None
        } else {
            let alternation = map
                .keys()
                .map(|key| regex::escape(key))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\[(?:{})\]", alternation);
            // escaped literals joined by `|` always form a valid pattern
            Some(Regex::new(&pattern).expect("marker alternation"))
        };
        Self { map, markers }
    }

    /// Identifier for an emotion key, case-insensitive
    pub fn id_for(&self, key: &str) -> Option<&ExpressionId> {
        self.map.get(&key.to_lowercase())
    }

    /// Every map entry whose `[key]` marker occurs in the text, in map
    /// order. One entry per key no matter how often it repeats.
    pub fn entries_found_in(&self, text: &str) -> Vec<(&str, &ExpressionId)> {
        let lower = text.to_lowercase();
        self.map
            .iter()
            .filter(|(key, _)| lower.contains(&format!("[{}]", key)))
            .map(|(key, id)| (key.as_str(), id))
            .collect()
    }

    /// Identifiers for every distinct key present in the text, map order
    pub fn ids_found_in(&self, text: &str) -> Vec<ExpressionId> {
        self.entries_found_in(text)
            .into_iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Remove every `[key]` marker, case-insensitively, preserving all
    /// other content and its casing. Removal repeats until no marker is
    /// left, so markers revealed by an earlier removal go too; the result
    /// is idempotent.
    pub fn strip_markers(&self, text: &str) -> String {
        let Some(markers) = &self.markers else {
            return text.to_string();
        };
        let mut out = text.to_string();
        // each pass strictly shortens the text, so this terminates
        while markers.is_match(&out) {
            out = markers.replace_all(&out, "").into_owned();
        }
        out
    }

    /// The known keys rendered for an upstream text generator's prompt,
    /// e.g. `"[anger], [joy],"`
    pub fn key_listing(&self) -> String {
        self.map
            .keys()
            .map(|key| format!("[{}],", key))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One queued expression change: fire, then hold for `delay` before the
/// next task runs
#[derive(Debug, Clone)]
pub struct ExpressionTask {
    pub id: ExpressionId,
    pub delay: Duration,
}

/// Sequential expression dispatcher.
///
/// Tasks are explicit values executed only when the worker dequeues them;
/// enqueueing has no side effect beyond queuing. One worker, run to
/// completion, enqueue order, no cancellation.
#[derive(Debug)]
pub struct ExpressionDispatcher {
    tx: UnboundedSender<ExpressionTask>,
}

impl ExpressionDispatcher {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn spawn(broadcaster: Arc<Broadcaster>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ExpressionTask>();

        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                debug!("Dispatching expression {}", task.id);
                broadcaster
                    .send(&BroadcastEvent::Expression(task.id.clone()))
                    .await;
                tokio::time::sleep(task.delay).await;
            }
        });

        Self { tx }
    }

    pub fn enqueue(&self, task: ExpressionTask) {
        if self.tx.send(task).is_err() {
            warn!("Expression worker is gone; dropping task");
        }
    }
}
