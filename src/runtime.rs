//! Runtime services and shared state for support-triage.

use futures::future::join_all;
use tracing::instrument;

use crate::base::{config::Config, types::Res};
use crate::interaction::router;
use crate::service::{db::DbClient, llm::LlmClient};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the ticket store, the language-model gateway, and configuration.
/// The gateway is built once here and handed to every request.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The ticket store instance.
    pub db: DbClient,
    /// The LLM client instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance.
    ///
    /// Fails with a configuration error when the gateway credential is missing.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the LLM client first: a missing credential should fail before touching disk.
        let llm = LlmClient::openai(&config)?;

        // Initialize the ticket store.
        let db = DbClient::surreal(&config).await?;

        Ok(Self { config, db, llm })
    }

    /// Triage a single message and return the customer-facing reply.
    pub async fn handle_message(&self, message: &str, trace_id: Option<&str>, model: Option<&str>) -> Res<String> {
        router::handle_message(&self.config, &self.db, &self.llm, message, trace_id, model).await
    }

    /// Triage independent messages concurrently; results keep the input order.
    pub async fn handle_messages<S>(&self, messages: &[S], trace_id: Option<&str>, model: Option<&str>) -> Vec<Res<String>>
    where
        S: AsRef<str>,
    {
        join_all(messages.iter().map(|message| self.handle_message(message.as_ref(), trace_id, model))).await
    }
}
