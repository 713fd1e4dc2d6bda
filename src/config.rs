use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Front-end
    pub base_url: String,
    pub model_dict_path: String,
    pub avatar_model: String,

    // Speech recognition
    pub asr_host: String,
    pub asr_port: u16,
    pub asr_language: String,
    pub asr_use_itn: bool,
    pub sample_rate: u32,

    // Expression dispatch
    pub expression_delay_secs: f64,

    // Local microphone VAD gate
    pub vad_energy_threshold: f32,
    pub vad_silence_chunks: usize,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            model_dict_path: "model_dict.json".to_string(),
            avatar_model: "shizuku-local".to_string(),
            asr_host: "localhost".to_string(),
            asr_port: 10301,
            asr_language: "auto".to_string(),
            asr_use_itn: false,
            sample_rate: 16000,
            expression_delay_secs: 3.0,
            vad_energy_threshold: 0.02,
            vad_silence_chunks: 15,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let config_path = config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            match serde_json::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    // Graceful degradation: log warning and use defaults
                    tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                    // Backup corrupt file for debugging
                    let backup_path = config_path.with_extension("json.corrupt");
                    let _ = std::fs::rename(&config_path, &backup_path);
                    Ok(Self::default())
                }
            }
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stagelink")
        .join("config.json")
}
