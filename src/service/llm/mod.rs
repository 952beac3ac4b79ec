pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Res;

// Types.

/// The author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// A single role-tagged turn sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A completion request for the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature; `None` leaves it to the provider.
    pub temperature: Option<f32>,
    /// Ask the model for a JSON object instead of free text.
    pub json_output: bool,
    /// Upper bound on generated tokens; `None` leaves it to the provider.
    pub max_tokens: Option<u32>,
    /// Ordered conversation turns.
    pub turns: Vec<ChatTurn>,
}

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This is the language-model gateway: it accepts a prompt and returns the generated text,
/// which is JSON-shaped when `json_output` is requested. Implementations fail with
/// [`TriageError::GatewayUnavailable`](crate::base::types::TriageError::GatewayUnavailable)
/// on transport, auth, timeout, or empty-response failures.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Run a single completion.
    async fn complete(&self, request: &CompletionRequest) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
