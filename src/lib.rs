//! Library root for `support-triage`.
//!
//! Support-triage is an LLM-powered assistant for banking customer-support messages designed to:
//! - Classify each message as positive feedback, negative feedback, or a query
//! - Open a trackable ticket for every complaint
//! - Answer ticket status queries from the ticket store
//! - Produce a short, customer-facing reply for every message
//!
//! The service integrates with OpenAI for classification and replies, and SurrealDB
//! for ticket storage. The architecture is built around extensible traits that allow
//! for different implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Res};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Builds the runtime (gateway and ticket store) and triages the given messages,
/// returning one result per message in input order.
pub async fn start(config: Config, messages: &[String], trace_id: Option<&str>, model: Option<&str>) -> Res<Vec<Res<String>>> {
    info!("Starting support-triage ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Triage the messages.
    Ok(runtime.handle_messages(messages, trace_id, model).await)
}
