// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Analysis orchestration
//!
//! Drives a single generation call per operation, normalizes the result, and
//! records completed analyses in the history log. History logging is
//! best-effort: a persistence failure is logged and the generation output is
//! still returned, so a successful analysis is never hidden from the caller.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::ChatSession;
use crate::config::AppConfig;
use crate::engine::{GenerationService, Part};
use crate::history::{AnalysisRecord, AnalysisRecordInput, HistoryStore, RecordKind};
use crate::media::MediaPayload;
use crate::{HieroError, Result};

/// Analysis operations exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Translate hieroglyphs on the artifact
    Translate,
    /// Identify the artifact itself
    Analyze,
    /// Photorealistic re-rendering
    Render,
}

/// Structured result of a translation or artifact analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationReport {
    pub translation: String,
    pub context: String,
    pub symbolism: String,
    pub artifact_type: String,
}

/// Result of a photorealistic re-rendering
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub caption: Option<String>,
}

impl RenderedArtifact {
    pub fn data_url(&self) -> String {
        use base64::{engine::general_purpose, Engine as _};
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// Output of a completed analysis operation
#[derive(Debug, Clone)]
pub enum AnalysisOutput {
    Report(TranslationReport),
    Rendered(RenderedArtifact),
}

/// A completed operation: the generation output plus the history record, when
/// persistence succeeded
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub output: AnalysisOutput,
    /// `None` when history persistence failed; the failure is logged, never
    /// surfaced as an error
    pub record: Option<AnalysisRecord>,
}

/// Verdict on a quiz answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizVerdict {
    pub is_correct: bool,
    pub explanation: String,
}

/// Facade over the generation service and the history store
pub struct Orchestrator {
    engine: Arc<dyn GenerationService>,
    store: Arc<dyn HistoryStore>,
    config: AppConfig,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn GenerationService>,
        store: Arc<dyn HistoryStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    /// Run one analysis operation end to end
    ///
    /// `prompt` is optional free-text guidance, defaulted per kind when
    /// absent. Exactly one generation call is attempted; failures are not
    /// retried and produce no history record.
    pub async fn perform(
        &self,
        kind: OperationKind,
        media: MediaPayload,
        prompt: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        if media.is_empty() {
            return Err(HieroError::Validation("No media supplied".to_string()));
        }

        match kind {
            OperationKind::Translate | OperationKind::Analyze => {
                self.run_report(kind, media, prompt).await
            }
            OperationKind::Render => self.run_render(media, prompt).await,
        }
    }

    /// Snapshot of the analysis history, newest first
    pub async fn history(&self) -> Result<Vec<AnalysisRecord>> {
        self.store.list().await
    }

    /// Start a chat session with the assistant persona. The session is
    /// expected to live for the rest of the process; it is never reset
    /// implicitly.
    pub fn start_chat(&self) -> ChatSession {
        ChatSession::new(
            Arc::clone(&self.engine),
            self.config.engine.models.text.clone(),
            self.config.prompts.assistant.clone(),
        )
    }

    async fn run_report(
        &self,
        kind: OperationKind,
        media: MediaPayload,
        prompt: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        let guidance = match (prompt, kind) {
            (Some(p), _) => p.to_string(),
            (None, OperationKind::Analyze) => self.config.prompts.analyze.clone(),
            (None, _) => self.config.prompts.translate.clone(),
        };

        let instruction = format!(
            "You are an expert Egyptologist. Analyze the provided image which \
             contains an artifact with hieroglyphs. {} Your analysis must be \
             returned as a JSON object that strictly follows this schema: \
             {{\"translation\": \"string\", \"context\": \"string\", \
             \"symbolism\": \"string\", \"artifact_type\": \"string\"}}. \
             Translate the hieroglyphs, explain the historical context, detail \
             any symbolism, and describe the artifact type.",
            guidance
        );

        let prepared = media.prepared_for_transport();
        let parts = vec![
            Part::inline(prepared.mime_type.clone(), prepared.to_base64()),
            Part::text(instruction.clone()),
        ];

        let raw = self
            .engine
            .generate_json(&self.config.engine.models.vision, parts)
            .await?;
        let report: TranslationReport = serde_json::from_str(&raw)
            .map_err(|e| HieroError::Service(format!("Malformed analysis response: {}", e)))?;

        info!("Analysis complete: {}", report.artifact_type);

        // Translation and artifact analysis both keep the original media as
        // the visual artifact of record
        let record = self
            .record_best_effort(RecordKind::Translation, instruction, media.to_data_url())
            .await;

        Ok(AnalysisOutcome {
            output: AnalysisOutput::Report(report),
            record,
        })
    }

    async fn run_render(
        &self,
        media: MediaPayload,
        prompt: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        let instruction = prompt
            .map(str::to_string)
            .unwrap_or_else(|| self.config.prompts.render.clone());

        let prepared = media.prepared_for_transport();
        let parts = vec![
            Part::inline(prepared.mime_type.clone(), prepared.to_base64()),
            Part::text(instruction.clone()),
        ];

        let image = self
            .engine
            .generate_image(&self.config.engine.models.image, parts)
            .await?;

        let rendered = RenderedArtifact {
            mime_type: image.mime_type,
            data: image.data,
            caption: image.caption,
        };

        info!("Render complete ({} bytes)", rendered.data.len());

        let record = self
            .record_best_effort(RecordKind::Render, instruction, rendered.data_url())
            .await;

        Ok(AnalysisOutcome {
            output: AnalysisOutput::Rendered(rendered),
            record,
        })
    }

    async fn record_best_effort(
        &self,
        kind: RecordKind,
        prompt: String,
        result_url: String,
    ) -> Option<AnalysisRecord> {
        let input = AnalysisRecordInput {
            kind,
            prompt,
            result_url,
        };
        match self.store.append(input).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to record analysis in history: {}", e);
                None
            }
        }
    }

    /// Judge a quiz answer about ancient Egypt
    pub async fn evaluate_quiz(&self, question: &str, answer: &str) -> Result<QuizVerdict> {
        let instruction = format!(
            "Question: \"{}\"\nUser's Answer: \"{}\"\nEvaluate if the user's \
             answer is correct for the question about ancient Egypt. Provide a \
             brief explanation. Return a JSON object strictly following this \
             schema: {{\"is_correct\": boolean, \"explanation\": \"string\"}}",
            question, answer
        );

        let raw = self
            .engine
            .generate_json(&self.config.engine.models.text, vec![Part::text(instruction)])
            .await?;
        serde_json::from_str(&raw)
            .map_err(|e| HieroError::Service(format!("Malformed quiz verdict: {}", e)))
    }

    /// Generate a Markdown blog post on an Ancient Egypt topic
    pub async fn generate_blog_post(&self, topic: &str) -> Result<String> {
        let instruction = format!(
            "Generate a high-quality, SEO-optimized blog post about \"{}\" in \
             the context of Ancient Egypt. The post should be engaging, \
             educational, and around 400 words. It must include a catchy title, \
             an introduction, several paragraphs of content, and a conclusion. \
             Format the entire output as a single Markdown string. Start with a \
             title using a single H1 tag (e.g., # The Secrets of...).",
            topic
        );

        self.engine
            .generate_text(&self.config.engine.models.text, vec![Part::text(instruction)])
            .await
    }

    /// Synthesize speech for the given text; returns raw 24 kHz 16-bit mono
    /// PCM bytes
    pub async fn synthesize_speech(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        let voice = self.config.speech.voice_for(lang);
        self.engine
            .generate_speech(&self.config.engine.models.speech, text, voice)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GeneratedImage;
    use crate::history::JsonFileHistory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Scripted generation backend; `None` responses fail with a service
    /// error
    #[derive(Default)]
    struct StubEngine {
        json_response: Option<String>,
        text_response: Option<String>,
        image_response: Option<(String, Vec<u8>, Option<String>)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationService for StubEngine {
        async fn generate_text(&self, _model: &str, _parts: Vec<Part>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text_response
                .clone()
                .ok_or_else(|| HieroError::Service("stub failure".to_string()))
        }

        async fn generate_json(&self, _model: &str, _parts: Vec<Part>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.json_response
                .clone()
                .ok_or_else(|| HieroError::Service("stub failure".to_string()))
        }

        async fn generate_image(&self, _model: &str, _parts: Vec<Part>) -> Result<GeneratedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.image_response
                .clone()
                .map(|(mime_type, data, caption)| GeneratedImage {
                    mime_type,
                    data,
                    caption,
                })
                .ok_or_else(|| HieroError::Service("stub failure".to_string()))
        }

        async fn generate_speech(&self, _model: &str, _text: &str, _voice: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0, 1])
        }

        async fn chat(
            &self,
            _model: &str,
            _system_instruction: &str,
            _turns: &[crate::engine::Content],
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text_response
                .clone()
                .ok_or_else(|| HieroError::Service("stub failure".to_string()))
        }
    }

    /// Store whose writes always fail
    struct FailingStore;

    #[async_trait]
    impl HistoryStore for FailingStore {
        async fn append(&self, _input: AnalysisRecordInput) -> Result<AnalysisRecord> {
            Err(HieroError::Persistence("disk full".to_string()))
        }

        async fn list(&self) -> Result<Vec<AnalysisRecord>> {
            Ok(Vec::new())
        }
    }

    const REPORT_JSON: &str = r#"{
        "translation": "Life, prosperity, health",
        "context": "New Kingdom votive inscription",
        "symbolism": "The ankh denotes life",
        "artifact_type": "Stela"
    }"#;

    fn media() -> MediaPayload {
        MediaPayload::new("image/png", vec![1, 2, 3, 4])
    }

    fn orchestrator_with(
        engine: StubEngine,
        store: Arc<dyn HistoryStore>,
    ) -> (Orchestrator, Arc<StubEngine>) {
        let engine = Arc::new(engine);
        let orchestrator = Orchestrator::new(
            Arc::clone(&engine) as Arc<dyn GenerationService>,
            store,
            AppConfig::default(),
        );
        (orchestrator, engine)
    }

    #[tokio::test]
    async fn test_translate_reports_and_records() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));
        let (orchestrator, _) = orchestrator_with(
            StubEngine {
                json_response: Some(REPORT_JSON.to_string()),
                ..Default::default()
            },
            Arc::clone(&store) as Arc<dyn HistoryStore>,
        );

        let outcome = orchestrator
            .perform(OperationKind::Translate, media(), Some("Translate this."))
            .await
            .unwrap();

        let report = match outcome.output {
            AnalysisOutput::Report(r) => r,
            _ => panic!("expected report output"),
        };
        assert_eq!(report.translation, "Life, prosperity, health");
        assert_eq!(report.artifact_type, "Stela");

        let record = outcome.record.expect("record persisted");
        assert_eq!(record.kind, RecordKind::Translation);
        assert!(record.prompt.contains("Translate this."));
        assert_eq!(record.result_url, media().to_data_url());

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], record);
    }

    #[tokio::test]
    async fn test_render_records_generated_image_url() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));
        let (orchestrator, _) = orchestrator_with(
            StubEngine {
                image_response: Some((
                    "image/jpeg".to_string(),
                    vec![9, 9, 9],
                    Some("A gleaming restored vase.".to_string()),
                )),
                ..Default::default()
            },
            Arc::clone(&store) as Arc<dyn HistoryStore>,
        );

        let outcome = orchestrator
            .perform(OperationKind::Render, media(), None)
            .await
            .unwrap();

        let rendered = match outcome.output {
            AnalysisOutput::Rendered(r) => r,
            _ => panic!("expected rendered output"),
        };
        assert_eq!(rendered.caption.as_deref(), Some("A gleaming restored vase."));

        let record = outcome.record.expect("record persisted");
        assert_eq!(record.kind, RecordKind::Render);
        // The record points at the generated image, not the upload
        assert_eq!(record.result_url, rendered.data_url());
    }

    #[tokio::test]
    async fn test_failing_generation_leaves_history_unchanged() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));
        let (orchestrator, _) = orchestrator_with(
            StubEngine::default(),
            Arc::clone(&store) as Arc<dyn HistoryStore>,
        );

        let before = store.list().await.unwrap();
        let result = orchestrator
            .perform(OperationKind::Translate, media(), None)
            .await;

        assert!(matches!(result, Err(HieroError::Service(_))));
        assert_eq!(store.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_malformed_report_is_service_error() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));
        let (orchestrator, _) = orchestrator_with(
            StubEngine {
                json_response: Some("definitely not json".to_string()),
                ..Default::default()
            },
            Arc::clone(&store) as Arc<dyn HistoryStore>,
        );

        let result = orchestrator
            .perform(OperationKind::Analyze, media(), None)
            .await;

        assert!(matches!(result, Err(HieroError::Service(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_media_rejected_before_generation() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));
        let (orchestrator, engine) = orchestrator_with(
            StubEngine {
                json_response: Some(REPORT_JSON.to_string()),
                ..Default::default()
            },
            store as Arc<dyn HistoryStore>,
        );

        let result = orchestrator
            .perform(
                OperationKind::Translate,
                MediaPayload::new("image/png", Vec::new()),
                None,
            )
            .await;

        assert!(matches!(result, Err(HieroError::Validation(_))));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_output() {
        let (orchestrator, _) = orchestrator_with(
            StubEngine {
                json_response: Some(REPORT_JSON.to_string()),
                ..Default::default()
            },
            Arc::new(FailingStore) as Arc<dyn HistoryStore>,
        );

        let outcome = orchestrator
            .perform(OperationKind::Translate, media(), None)
            .await
            .unwrap();

        assert!(outcome.record.is_none());
        assert!(matches!(outcome.output, AnalysisOutput::Report(_)));
    }

    #[tokio::test]
    async fn test_quiz_verdict_parsing() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));
        let (orchestrator, _) = orchestrator_with(
            StubEngine {
                json_response: Some(
                    r#"{"is_correct": true, "explanation": "Khufu built the Great Pyramid."}"#
                        .to_string(),
                ),
                ..Default::default()
            },
            Arc::clone(&store) as Arc<dyn HistoryStore>,
        );

        let verdict = orchestrator
            .evaluate_quiz("Who built the Great Pyramid?", "Khufu")
            .await
            .unwrap();
        assert!(verdict.is_correct);

        // Quiz evaluation does not write history records
        assert!(store.list().await.unwrap().is_empty());
    }
}
