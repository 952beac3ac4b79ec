//! Domain types, the error taxonomy, and result aliases.

use std::{fmt, sync::LazyLock};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport error type used across the crate.
pub type Err = anyhow::Error;
/// Result alias over [`Err`].
pub type Res<T> = Result<T, Err>;
/// Result with no value.
pub type Void = Res<()>;

// Errors.

/// The error taxonomy surfaced by the triage core.
///
/// These travel inside [`Err`]; use `err.downcast_ref::<TriageError>()` to branch on them.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Empty or whitespace-only message.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The language-model gateway could not be reached, or returned nothing usable.
    #[error("language-model gateway unavailable: {0}")]
    GatewayUnavailable(String),
    /// The ticket store could not be opened, read, or written.
    #[error("ticket storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Missing or invalid configuration (e.g., no API credential).
    #[error("configuration error: {0}")]
    Configuration(String),
}

// Classification.

/// The closed set of outcomes for a classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    /// Praise, thanks, or satisfaction.
    PositiveFeedback,
    /// A complaint or problem report.
    NegativeFeedback,
    /// Anything else, including ticket status checks.
    Query,
}

impl ClassificationLabel {
    /// Normalize a raw label emitted by a model.
    ///
    /// The value is trimmed, lower-cased, and has internal whitespace collapsed to underscores
    /// before it is matched against the synonym table. Anything unrecognized is a `Query`.
    pub fn from_model_output(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("_");

        match normalized.as_str() {
            "positive" | "positive_feedback" | "pos" => Self::PositiveFeedback,
            "negative" | "negative_feedback" | "neg" => Self::NegativeFeedback,
            _ => Self::Query,
        }
    }

    /// The canonical `snake_case` name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositiveFeedback => "positive_feedback",
            Self::NegativeFeedback => "negative_feedback",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The downstream response path selected by a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Thank the customer.
    PositiveFeedbackHandler,
    /// Apologize and open a ticket.
    NegativeFeedbackHandler,
    /// Answer the question, looking up a ticket when one is named.
    QueryHandler,
}

impl Route {
    /// The route tag used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositiveFeedbackHandler => "feedback_positive_handler",
            Self::NegativeFeedbackHandler => "feedback_negative_handler",
            Self::QueryHandler => "query_handler",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a label to its route.
///
/// Exhaustive on purpose: adding a label must not compile until it has a route.
pub const fn route_for(label: ClassificationLabel) -> Route {
    match label {
        ClassificationLabel::PositiveFeedback => Route::PositiveFeedbackHandler,
        ClassificationLabel::NegativeFeedback => Route::NegativeFeedbackHandler,
        ClassificationLabel::Query => Route::QueryHandler,
    }
}

/// The classifier's verdict for a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    /// The normalized label.
    pub label: ClassificationLabel,
    /// Short explanation from the model, or the fallback reason.
    pub rationale: Option<String>,
}

impl ClassificationResult {
    /// The route for this verdict's label.
    pub fn route(&self) -> Route {
        route_for(self.label)
    }
}

// Tickets.

/// Status given to a ticket when it is opened.
pub const STATUS_UNRESOLVED: &str = "Unresolved";
/// Status given to a ticket once it has been handled.
pub const STATUS_RESOLVED: &str = "Resolved";

const TICKET_NUMBER_MIN: u32 = 100_000;
const TICKET_NUMBER_MAX: u32 = 999_999;

static TICKET_NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[0-9]{6}\b").unwrap());

/// A six-digit ticket number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Draw a fresh number uniformly from `[100000, 999999]`.
    pub fn generate() -> Self {
        let value = rand::thread_rng().gen_range(TICKET_NUMBER_MIN..=TICKET_NUMBER_MAX);
        Self(value.to_string())
    }

    /// The number as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for TicketNumber {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Find the first standalone run of exactly six digits in `text`.
pub fn extract_ticket_number(text: &str) -> Option<TicketNumber> {
    TICKET_NUMBER_PATTERN.find(text).map(|m| TicketNumber(m.as_str().to_string()))
}

/// A support ticket as seen by callers of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Six-digit ticket number; also the record key.
    pub ticket_number: String,
    /// Free-form status, e.g. `Unresolved`.
    pub status: String,
    /// The customer message that opened the ticket.
    pub message: String,
}
