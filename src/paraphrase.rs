//! Optional paraphrasing step.
//!
//! Asks a generative-text model to keep only the informational content of a
//! comment (no greetings, names, signatures or disclaimers). Best-effort:
//! on any failure the input text is used unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ServiceError;

/// Instruction sent ahead of the comment text.
pub const PARAPHRASE_INSTRUCTION: &str = "Extract only the informational content from the message below. \
Remove the names of the sender and recipients, greetings, salutations, signatures, \
disclaimers and legal declarations. Do not add commentary. Return only the extracted content.";

/// Stop marker that keeps the model from continuing into another dialogue turn.
pub const STOP_SEQUENCE: &str = "User:";

/// A text-generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop_sequences: Vec<String>,
}

/// A managed generative-text model endpoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run `request` against `model_id` and return the first generated text.
    async fn invoke(
        &self,
        model_id: &str,
        request: &GenerationRequest,
    ) -> Result<String, ServiceError>;
}

/// Paraphraser configuration.
#[derive(Debug, Clone)]
pub struct ParaphraseConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ParaphraseConfig {
    fn default() -> Self {
        Self {
            model_id: "amazon.titan-text-express-v1".to_string(),
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Strips residual salutations and signatures with a [`TextGenerator`].
pub struct Paraphraser {
    generator: Arc<dyn TextGenerator>,
    config: ParaphraseConfig,
}

impl Paraphraser {
    pub fn new(generator: Arc<dyn TextGenerator>, config: ParaphraseConfig) -> Self {
        Self { generator, config }
    }

    /// Build the generation request for `text`.
    pub fn build_request(&self, text: &str) -> GenerationRequest {
        GenerationRequest {
            prompt: build_prompt(text),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stop_sequences: vec![STOP_SEQUENCE.to_string()],
        }
    }

    /// Paraphrase `text`, falling back to it on failure or empty output.
    pub async fn paraphrase(&self, text: &str) -> String {
        let request = self.build_request(text);
        match self.generator.invoke(&self.config.model_id, &request).await {
            Ok(output) if !output.trim().is_empty() => {
                debug!(
                    model = %self.config.model_id,
                    before = text.len(),
                    after = output.len(),
                    "Paraphrased comment"
                );
                output.trim().to_string()
            }
            Ok(_) => {
                warn!(model = %self.config.model_id, "Paraphraser returned no text, keeping input");
                text.to_string()
            }
            Err(e) => {
                warn!(model = %self.config.model_id, error = %e, "Paraphrase failed, keeping input");
                text.to_string()
            }
        }
    }
}

/// Dialogue-style prompt: instruction and text as the user turn, then the bot turn.
pub fn build_prompt(text: &str) -> String {
    format!("User: {PARAPHRASE_INSTRUCTION}\n\n{text}\n\nBot:")
}
