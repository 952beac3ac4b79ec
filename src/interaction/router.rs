//! Dispatch of a classified message to its response path.
//!
//! Each route builds a set of instructions for a responder persona, touching the ticket
//! store only where it has to: the negative path opens a ticket, the query path looks one up.
//! The responder's text is returned verbatim; a responder failure is not retried.

use tracing::{debug, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        prompts::{self, AgentProfile},
        types::{ClassificationResult, Res, Route, STATUS_UNRESOLVED, TicketNumber, TriageError, extract_ticket_number},
    },
    interaction::classifier,
    service::{
        db::DbClient,
        llm::{ChatTurn, CompletionRequest, LlmClient},
    },
};

/// How many fresh numbers to draw before giving up on finding an unused one.
const MAX_TICKET_NUMBER_ATTEMPTS: usize = 16;

/// What the query path learned about a referenced ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketLookup {
    /// The message names a ticket that exists.
    Found { ticket_number: TicketNumber, status: String },
    /// The message names a ticket the store does not know.
    NotFound { ticket_number: TicketNumber },
    /// The message names no ticket at all.
    Missing,
}

/// The persona and instructions handed to the responder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePlan {
    pub route: Route,
    pub agent: AgentProfile,
    pub instructions: String,
}

/// Classify a message, run its route, and return the responder's reply.
///
/// `model` overrides both the classifier and responder models for this request.
#[instrument(name = "router::handle_message", skip_all, fields(trace_id = trace_id.unwrap_or_default()))]
pub async fn handle_message(config: &Config, db: &DbClient, llm: &LlmClient, message: &str, trace_id: Option<&str>, model: Option<&str>) -> Res<String> {
    if message.trim().is_empty() {
        return Err(TriageError::InvalidInput("Message must be a non-empty string.".to_string()).into());
    }

    let classifier_model = model.unwrap_or(config.openai_classifier_model.as_str());
    let responder_model = model.unwrap_or(config.openai_responder_model.as_str());

    let classification = classifier::classify(llm, &config.classifier_directive, message, classifier_model, trace_id).await?;

    info!("Routing to `{}` ({}).", classification.route(), classification.rationale.as_deref().unwrap_or_default());

    let plan = plan_response(db, &classification, message, trace_id).await?;

    respond(config, llm, &plan, responder_model).await
}

/// Run the store side of a route and build the responder instructions.
#[instrument(name = "router::plan_response", skip_all, fields(route = %classification.route()))]
pub async fn plan_response(db: &DbClient, classification: &ClassificationResult, message: &str, trace_id: Option<&str>) -> Res<ResponsePlan> {
    let plan = match classification.route() {
        Route::PositiveFeedbackHandler => ResponsePlan {
            route: Route::PositiveFeedbackHandler,
            agent: prompts::FEEDBACK_AGENT,
            instructions: positive_instructions(message, trace_id),
        },
        Route::NegativeFeedbackHandler => {
            let ticket_number = open_ticket(db, message).await?;

            ResponsePlan {
                route: Route::NegativeFeedbackHandler,
                agent: prompts::FEEDBACK_AGENT,
                instructions: negative_instructions(message, &ticket_number, trace_id),
            }
        }
        Route::QueryHandler => {
            let lookup = lookup_ticket(db, message).await?;

            ResponsePlan {
                route: Route::QueryHandler,
                agent: prompts::QUERY_AGENT,
                instructions: query_instructions(message, &lookup, trace_id),
            }
        }
    };

    Ok(plan)
}

/// Open an `Unresolved` ticket for a complaint under a fresh number.
///
/// Numbers already in the store are skipped; an existing ticket is never overwritten.
#[instrument(name = "router::open_ticket", skip_all)]
pub async fn open_ticket(db: &DbClient, message: &str) -> Res<TicketNumber> {
    for _ in 0..MAX_TICKET_NUMBER_ATTEMPTS {
        let ticket_number = TicketNumber::generate();

        if !db.create_ticket_if_absent(ticket_number.as_str(), message, STATUS_UNRESOLVED).await? {
            warn!("Ticket number `{ticket_number}` already taken, drawing another.");
            continue;
        }

        info!("Opened ticket `{ticket_number}`.");

        return Ok(ticket_number);
    }

    Err(TriageError::StorageUnavailable(format!("No unused ticket number found after {MAX_TICKET_NUMBER_ATTEMPTS} attempts.")).into())
}

/// Find the ticket a query refers to, if any.
#[instrument(name = "router::lookup_ticket", skip_all)]
pub async fn lookup_ticket(db: &DbClient, message: &str) -> Res<TicketLookup> {
    let Some(ticket_number) = extract_ticket_number(message) else {
        debug!("No ticket number in message.");
        return Ok(TicketLookup::Missing);
    };

    let lookup = match db.get_ticket_status(ticket_number.as_str()).await? {
        Some(status) => TicketLookup::Found { ticket_number, status },
        None => TicketLookup::NotFound { ticket_number },
    };

    debug!("Ticket lookup: {lookup:?}");

    Ok(lookup)
}

/// Send a plan to the responder and return its text untouched.
#[instrument(name = "router::respond", skip_all, fields(route = %plan.route))]
pub async fn respond(config: &Config, llm: &LlmClient, plan: &ResponsePlan, model: &str) -> Res<String> {
    let request = CompletionRequest {
        model: model.to_string(),
        temperature: Some(config.openai_responder_temperature),
        json_output: false,
        max_tokens: Some(config.openai_max_tokens),
        turns: vec![ChatTurn::system(plan.agent.directive()), ChatTurn::user(plan.instructions.clone())],
    };

    llm.complete(&request).await
}

// Instructions.

pub fn positive_instructions(message: &str, trace_id: Option<&str>) -> String {
    let task = "\
The customer left positive feedback. Thank them warmly in 1-2 sentences. \
If the message includes the customer's name, address them by it; otherwise do not use a name or a placeholder for one.";

    compose_instructions(message, "positive_feedback", task, prompts::POSITIVE_EXPECTED_OUTPUT, trace_id)
}

pub fn negative_instructions(message: &str, ticket_number: &TicketNumber, trace_id: Option<&str>) -> String {
    let task = format!(
        "The customer left negative feedback. Apologize sincerely and tell them that ticket {ticket_number} has been opened and will be followed up. \
State the ticket number exactly as {ticket_number}. Keep it to 1-2 sentences."
    );

    compose_instructions(message, "negative_feedback", &task, prompts::NEGATIVE_EXPECTED_OUTPUT, trace_id)
}

pub fn query_instructions(message: &str, lookup: &TicketLookup, trace_id: Option<&str>) -> String {
    let task = match lookup {
        TicketLookup::Found { ticket_number, status } => {
            format!("The customer asked about ticket {ticket_number}. Its current status is \"{status}\". Report that status in 1-2 sentences.")
        }
        TicketLookup::NotFound { ticket_number } => format!(
            "The customer asked about ticket {ticket_number}, but no ticket with that number was found. \
Tell them it could not be found and ask them to double-check the number, in 1-2 sentences."
        ),
        TicketLookup::Missing => "The customer asked a question but gave no ticket number. Politely ask them for their 6-digit ticket number, in 1-2 sentences.".to_string(),
    };

    compose_instructions(message, "query", &task, prompts::QUERY_EXPECTED_OUTPUT, trace_id)
}

fn compose_instructions(message: &str, feedback_type: &str, task: &str, expected_output: &str, trace_id: Option<&str>) -> String {
    let mut instructions = format!("## Customer Message\n\n{message}\n\n## Message Type\n\n{feedback_type}\n\n## Task\n\n{task}\n\n## Expected Output\n\n{expected_output}\n");

    if let Some(trace_id) = trace_id {
        instructions.push_str(&format!("\n## Trace\n\nInclude this trace_id in your reply: {trace_id}\n"));
    }

    instructions
}
