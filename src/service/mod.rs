//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the collaborators used by support-triage:
//! - Ticket storage (e.g., SurrealDB)
//! - LLM services (e.g., OpenAI)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod db;
pub mod llm;
