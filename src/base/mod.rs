//! Core components, types, and utilities for support-triage.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Classifier directives and responder personas.
//! - Domain types, the error taxonomy, and result handling.

pub mod config;
pub mod prompts;
pub mod types;
