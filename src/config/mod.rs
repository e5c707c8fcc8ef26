// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Configuration management for HieroScribe

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Generation service configuration
    pub engine: EngineConfig,

    /// Prompt templates
    pub prompts: PromptConfig,

    /// Speech synthesis settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// History store settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    /// Base URL of the generation API
    pub url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    pub models: ModelConfig,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    /// Vision-capable model for translation and artifact analysis
    pub vision: String,
    #[serde(default = "default_text_model")]
    pub text: String,
    #[serde(default = "default_image_model")]
    pub image: String,
    #[serde(default = "default_speech_model")]
    pub speech: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    /// Default guidance appended to the translation instruction when the
    /// caller supplies none
    #[serde(default = "default_translate_prompt")]
    pub translate: String,

    #[serde(default = "default_analyze_prompt")]
    pub analyze: String,

    /// Full instruction for photorealistic re-rendering
    #[serde(default = "default_render_prompt")]
    pub render: String,

    /// System instruction for the chat assistant
    #[serde(default = "default_assistant_prompt")]
    pub assistant: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Per-language voice overrides (language code -> voice name)
    #[serde(default)]
    pub voices: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

// Default value functions
fn default_timeout() -> u64 { 120 }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_text_model() -> String { "gemini-2.5-pro".to_string() }
fn default_image_model() -> String { "gemini-2.5-flash-image".to_string() }
fn default_speech_model() -> String { "gemini-2.5-flash-preview-tts".to_string() }
fn default_voice() -> String { "Kore".to_string() }
fn default_history_path() -> String { "hieroscribe_history.json".to_string() }

fn default_translate_prompt() -> String {
    "Translate the hieroglyphs and analyze the artifact.".to_string()
}

fn default_analyze_prompt() -> String {
    "Identify the artifact, its era, and its function.".to_string()
}

fn default_render_prompt() -> String {
    "Re-imagine and render this ancient artifact as a brand new, pristine object \
     on display in a modern museum in the year 2025. The rendering should be \
     photorealistic, with accurate materials, textures, and lighting. Place it on \
     a simple, elegant museum stand with a dark, neutral background. Also, provide \
     a short, one-sentence artistic description of the rendered object.".to_string()
}

fn default_assistant_prompt() -> String {
    "You are an AI assistant specializing in Ancient Egypt, hieroglyphics, and \
     artifacts from the Grand Egyptian Museum. You are knowledgeable, friendly, \
     and provide educational insights. Your name is Thoth. Always respond in the \
     language of the user's prompt.".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                url: "https://generativelanguage.googleapis.com".to_string(),
                api_key_env: default_api_key_env(),
                models: ModelConfig {
                    vision: "gemini-2.5-pro".to_string(),
                    text: default_text_model(),
                    image: default_image_model(),
                    speech: default_speech_model(),
                },
                timeout_secs: default_timeout(),
            },
            prompts: PromptConfig::default(),
            speech: SpeechConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            translate: default_translate_prompt(),
            analyze: default_analyze_prompt(),
            render: default_render_prompt(),
            assistant: default_assistant_prompt(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let mut voices = HashMap::new();
        voices.insert("ar".to_string(), "Puck".to_string());
        Self {
            default_voice: default_voice(),
            voices,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

impl SpeechConfig {
    /// Resolve the voice for a language code
    pub fn voice_for(&self, lang: &str) -> &str {
        self.voices
            .get(lang)
            .map(String::as_str)
            .unwrap_or(&self.default_voice)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::HieroError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.engine.models.vision, "gemini-2.5-pro");
        assert_eq!(parsed.history.path, "hieroscribe_history.json");
    }

    #[test]
    fn test_voice_for_language() {
        let speech = SpeechConfig::default();
        assert_eq!(speech.voice_for("ar"), "Puck");
        assert_eq!(speech.voice_for("en"), "Kore");
        assert_eq!(speech.voice_for("de"), "Kore");
    }
}
