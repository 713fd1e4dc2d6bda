//! Model Descriptors
//!
//! The model dictionary is a static JSON list of records describing every
//! selectable avatar model: display name, asset URL, and the emotion map
//! the front-end understands for it. Loaded once; selection is an exact
//! name match.

use crate::error::{StageError, StageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// Opaque front-end expression identifier (string or number, passed
/// through as given)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpressionId {
    Index(i64),
    Name(String),
}

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionId::Index(i) => write!(f, "{}", i),
            ExpressionId::Name(s) => write!(f, "{}", s),
        }
    }
}

/// Mapping from lowercase emotion keys to expression identifiers.
///
/// Sorted map, so iteration order (and therefore dispatch order) is
/// deterministic.
pub type EmotionMap = BTreeMap<String, ExpressionId>;

/// One record from the model dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub url: String,
    #[serde(rename = "emotionMap")]
    pub emotion_map: EmotionMap,
}

/// Load the model dictionary from disk.
///
/// Emotion-map keys are lowercased here so later lookups are
/// case-insensitive. I/O and parse failures are logged and propagated;
/// the composition root treats them as fatal.
pub fn load_model_dict(path: &Path) -> StageResult<Vec<ModelDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!("Model dictionary not readable at {}: {}", path.display(), e);
        StageError::from(e)
    })?;

    let mut models: Vec<ModelDescriptor> = serde_json::from_str(&content).map_err(|e| {
        error!(
            "Error decoding model dictionary at {}: {}",
            path.display(),
            e
        );
        StageError::from(e)
    })?;

    for model in &mut models {
        let lowered: EmotionMap = std::mem::take(&mut model.emotion_map)
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        model.emotion_map = lowered;
    }

    Ok(models)
}

/// Select a model by exact name and normalize its asset URL.
///
/// Relative URLs (leading `/`) are prefixed with the front-end base
/// exactly once; absolute URLs pass through untouched. An unknown name is
/// the unrecoverable `ModelNotFound` kind.
pub fn select_model(
    models: &[ModelDescriptor],
    name: &str,
    base_url: &str,
) -> StageResult<ModelDescriptor> {
    let Some(found) = models.iter().find(|m| m.name == name) else {
        error!("No model found for '{}'", name);
        return Err(StageError::ModelNotFound(name.to_string()));
    };

    let mut model = found.clone();
    if model.url.starts_with('/') {
        model.url = format!("{}{}", base_url.trim_end_matches('/'), model.url);
    }

    info!("Model set to: {}", model.name);
    info!("URL set to: {}", model.url);

    Ok(model)
}
