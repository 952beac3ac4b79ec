//! Message handling for support-triage.
//!
//! This module provides the decision/response pipeline:
//! - Classifying incoming messages into a closed set of labels
//! - Routing each label to its response path
//! - Opening and looking up tickets on the way to a reply

pub mod classifier;
pub mod router;
