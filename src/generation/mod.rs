// Generation module
// Chat-completion collaborator that turns retrieved context into an answer


pub mod chat_client;

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::RagError;

pub use chat_client::{ChatCompletionClient, build_system_prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A retrieved passage that passed the relevance threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub content: String,
    pub category: String,
    pub source: String,
    pub similarity: f32,
}

/// Optional details used to personalize answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub branch: Option<String>,
    pub year: Option<String>,
    pub accommodation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Conversation so far, ending with the current user message
    pub messages: Vec<ChatMessage>,
    /// Ranked context, most similar first
    pub context: Vec<ContextItem>,
    pub profile: Option<StudentProfile>,
    /// Point after which the caller no longer waits for an answer
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub content: String,
    pub model: String,
    pub provider: String,
    /// Token accounting reported by the provider, passed through as-is
    pub usage: Option<serde_json::Value>,
}

/// Produces an answer from a conversation and retrieved context.
///
/// Failures (missing credentials, upstream errors) are returned as
/// [`RagError::Generation`]; implementations never fabricate an answer.
///
/// The caller stops polling once `request.deadline` passes. Work that cannot be
/// cancelled, such as a blocking HTTP call, must bound itself by the deadline
/// instead of running on unobserved.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedAnswer, RagError>;
}
