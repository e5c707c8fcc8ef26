// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Client for the hosted generation API
//!
//! All generative work (vision analysis, image rendering, text generation,
//! speech synthesis) is delegated to a Gemini-style `generateContent` HTTP
//! API. The client makes exactly one attempt per call; retry policy belongs
//! to the caller.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::{HieroError, Result};

/// One part of a request or response turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Inline binary payload (base64) with its MIME type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: base64_data.into(),
            }),
        }
    }
}

/// A conversation turn: role ("user" or "model") plus its parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: "model".to_string(),
            parts,
        }
    }
}

/// Inline image returned by an image-generation call
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub caption: Option<String>,
}

impl GeneratedImage {
    /// Data URL locator for the image
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.data)
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationSettings>,
}

#[derive(Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechSettings>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechSettings {
    voice_config: VoiceSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSettings {
    prebuilt_voice_config: PrebuiltVoice,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice {
    voice_name: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

/// Capabilities the orchestrator and chat require from the generation
/// collaborator. `GenAiClient` is the production implementation; tests
/// substitute a scripted stub.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Free-form text generation
    async fn generate_text(&self, model: &str, parts: Vec<Part>) -> Result<String>;

    /// Generation constrained to a JSON response; returns the raw JSON text
    async fn generate_json(&self, model: &str, parts: Vec<Part>) -> Result<String>;

    /// Image generation returning inline bytes plus an optional caption
    async fn generate_image(&self, model: &str, parts: Vec<Part>) -> Result<GeneratedImage>;

    /// Text-to-speech returning raw 24 kHz 16-bit mono PCM bytes
    async fn generate_speech(&self, model: &str, text: &str, voice: &str) -> Result<Vec<u8>>;

    /// Multi-turn conversation with a system instruction
    async fn chat(
        &self,
        model: &str,
        system_instruction: &str,
        turns: &[Content],
    ) -> Result<String>;
}

/// HTTP client for the generation API
pub struct GenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GenAiClient {
    /// Create a new client
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Create a client from configuration, reading the API key from the
    /// configured environment variable
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            HieroError::Config(format!(
                "API key environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Self::new(
            &config.url,
            &api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Check that the generation API is reachable
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                HieroError::Service(format!(
                    "Cannot reach generation API at {}: {}",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(HieroError::Service(format!(
                "Generation API returned status {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// List available model names
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| HieroError::Service(format!("Malformed models response: {}", e)))?;
        Ok(models.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate_content(
        &self,
        model: &str,
        contents: &[Content],
        system_instruction: Option<Content>,
        settings: Option<GenerationSettings>,
    ) -> Result<Vec<Part>> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let request = GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: settings,
        };

        debug!("Sending generation request: model={}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HieroError::Service(format!(
                "Generation API returned status {}",
                response.status()
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| HieroError::Service(format!("Malformed generation response: {}", e)))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .ok_or_else(|| HieroError::Service("Response contained no candidates".to_string()))
    }
}

/// Concatenate the text parts of a response
fn collect_text(parts: &[Part]) -> Result<String> {
    let text: String = parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(HieroError::Service(
            "Response contained no text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl GenerationService for GenAiClient {
    async fn generate_text(&self, model: &str, parts: Vec<Part>) -> Result<String> {
        let contents = [Content::user(parts)];
        let reply = self.generate_content(model, &contents, None, None).await?;
        collect_text(&reply)
    }

    async fn generate_json(&self, model: &str, parts: Vec<Part>) -> Result<String> {
        let contents = [Content::user(parts)];
        let settings = GenerationSettings {
            response_mime_type: Some("application/json".to_string()),
            ..Default::default()
        };
        let reply = self
            .generate_content(model, &contents, None, Some(settings))
            .await?;
        collect_text(&reply)
    }

    async fn generate_image(&self, model: &str, parts: Vec<Part>) -> Result<GeneratedImage> {
        let contents = [Content::user(parts)];
        let settings = GenerationSettings {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            ..Default::default()
        };
        let reply = self
            .generate_content(model, &contents, None, Some(settings))
            .await?;

        let mut image: Option<(String, Vec<u8>)> = None;
        let mut caption = None;

        for part in reply {
            if let Some(inline) = part.inline_data {
                let bytes = general_purpose::STANDARD.decode(inline.data.as_bytes())?;
                image = Some((inline.mime_type, bytes));
            } else if let Some(text) = part.text {
                caption = Some(text);
            }
        }

        match image {
            Some((mime_type, data)) => Ok(GeneratedImage {
                mime_type,
                data,
                caption,
            }),
            None => Err(HieroError::Service(
                "Response contained no image".to_string(),
            )),
        }
    }

    async fn generate_speech(&self, model: &str, text: &str, voice: &str) -> Result<Vec<u8>> {
        let contents = [Content::user(vec![Part::text(text)])];
        let settings = GenerationSettings {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechSettings {
                voice_config: VoiceSettings {
                    prebuilt_voice_config: PrebuiltVoice {
                        voice_name: voice.to_string(),
                    },
                },
            }),
            ..Default::default()
        };
        let reply = self
            .generate_content(model, &contents, None, Some(settings))
            .await?;

        let audio = reply
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or_else(|| HieroError::Service("Response contained no audio".to_string()))?;

        Ok(general_purpose::STANDARD.decode(audio.data.as_bytes())?)
    }

    async fn chat(
        &self,
        model: &str,
        system_instruction: &str,
        turns: &[Content],
    ) -> Result<String> {
        let system = Content {
            role: String::new(),
            parts: vec![Part::text(system_instruction)],
        };
        let reply = self
            .generate_content(model, turns, Some(system), None)
            .await?;
        collect_text(&reply)
    }
}
