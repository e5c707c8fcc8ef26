// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! Long-lived chat session with the assistant persona
//!
//! One session is constructed explicitly (via [`Orchestrator::start_chat`] or
//! [`ChatSession::new`]) and held for the process's duration; there is no
//! ambient singleton and no implicit reset.
//!
//! [`Orchestrator::start_chat`]: crate::orchestrator::Orchestrator::start_chat

use std::sync::Arc;

use crate::engine::{Content, GenerationService, Part};
use crate::media::MediaPayload;
use crate::Result;

/// Accumulating conversation with the generation service
pub struct ChatSession {
    engine: Arc<dyn GenerationService>,
    model: String,
    system_instruction: String,
    turns: Vec<Content>,
}

impl ChatSession {
    pub fn new(
        engine: Arc<dyn GenerationService>,
        model: String,
        system_instruction: String,
    ) -> Self {
        Self {
            engine,
            model,
            system_instruction,
            turns: Vec::new(),
        }
    }

    /// Send a text turn and return the assistant's reply
    pub async fn send(&mut self, text: &str) -> Result<String> {
        self.send_parts(vec![Part::text(text)]).await
    }

    /// Send a text turn accompanied by an image
    pub async fn send_with_image(&mut self, text: &str, media: &MediaPayload) -> Result<String> {
        let prepared = media.prepared_for_transport();
        self.send_parts(vec![
            Part::text(text),
            Part::inline(prepared.mime_type.clone(), prepared.to_base64()),
        ])
        .await
    }

    async fn send_parts(&mut self, parts: Vec<Part>) -> Result<String> {
        self.turns.push(Content::user(parts));

        match self
            .engine
            .chat(&self.model, &self.system_instruction, &self.turns)
            .await
        {
            Ok(reply) => {
                self.turns.push(Content::model(vec![Part::text(reply.as_str())]));
                Ok(reply)
            }
            Err(e) => {
                // A failed send leaves the transcript unchanged
                self.turns.pop();
                Err(e)
            }
        }
    }

    /// Conversation transcript so far
    pub fn turns(&self) -> &[Content] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GeneratedImage;
    use crate::{HieroError, Result};
    use async_trait::async_trait;

    struct EchoEngine {
        fail: bool,
    }

    #[async_trait]
    impl GenerationService for EchoEngine {
        async fn generate_text(&self, _model: &str, _parts: Vec<Part>) -> Result<String> {
            unimplemented!()
        }

        async fn generate_json(&self, _model: &str, _parts: Vec<Part>) -> Result<String> {
            unimplemented!()
        }

        async fn generate_image(&self, _model: &str, _parts: Vec<Part>) -> Result<GeneratedImage> {
            unimplemented!()
        }

        async fn generate_speech(&self, _model: &str, _text: &str, _voice: &str) -> Result<Vec<u8>> {
            unimplemented!()
        }

        async fn chat(
            &self,
            _model: &str,
            _system_instruction: &str,
            turns: &[Content],
        ) -> Result<String> {
            if self.fail {
                return Err(HieroError::Service("unreachable service".to_string()));
            }
            let last = turns
                .last()
                .and_then(|t| t.parts.first())
                .and_then(|p| p.text.clone())
                .unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    fn session(fail: bool) -> ChatSession {
        ChatSession::new(
            Arc::new(EchoEngine { fail }),
            "test-model".to_string(),
            "You are Thoth.".to_string(),
        )
    }

    #[tokio::test]
    async fn test_session_accumulates_turns() {
        let mut chat = session(false);

        let first = chat.send("Tell me about Anubis").await.unwrap();
        assert_eq!(first, "echo: Tell me about Anubis");
        assert_eq!(chat.turns().len(), 2);

        chat.send("And Osiris?").await.unwrap();
        assert_eq!(chat.turns().len(), 4);
        assert_eq!(chat.turns()[0].role, "user");
        assert_eq!(chat.turns()[1].role, "model");
        assert_eq!(chat.turns()[3].role, "model");
    }

    #[tokio::test]
    async fn test_failed_send_leaves_transcript_unchanged() {
        let mut chat = session(true);

        let result = chat.send("Hello").await;
        assert!(matches!(result, Err(HieroError::Service(_))));
        assert!(chat.turns().is_empty());
    }
}
