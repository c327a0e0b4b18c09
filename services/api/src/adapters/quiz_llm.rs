//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for the quiz generator. It implements the
//! `QuizGenerationService` port from the `core` crate by sending the prompt to an
//! OpenAI-compatible chat completion endpoint and returning the raw reply text.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use learnstake_core::ports::{PortError, PortResult, QuizGenerationService};
use tracing::{debug, error};

const SYSTEM_INSTRUCTIONS: &str = "You write multiple-choice quiz questions for online courses. \
Reply with the JSON array you are asked for and nothing else.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuizAdapter {
    /// Creates a new `OpenAiQuizAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn upstream(e: OpenAIError) -> PortError {
    match e {
        OpenAIError::ApiError(api) => PortError::Upstream(api.message),
        other => PortError::Upstream(other.to_string()),
    }
}

//=========================================================================================
// `QuizGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizGenerationService for OpenAiQuizAdapter {
    async fn generate(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!("Sending generation prompt to {}", self.model);
        let response = self.client.chat().create(request).await.map_err(|e| {
            error!("Generator request failed: {}", e);
            upstream(e)
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Upstream("generator returned no content".to_string()))
    }
}
