//! Binary entry point for `support-triage`.
//!
//! This module provides the command-line interface for support-triage with options
//! for configuration file paths and logging verbosity. It can triage messages, and
//! inspect or resolve tickets in the ticket store.

use clap::{Parser, Subcommand};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use support_triage::{
    base::{
        config::Config,
        types::{STATUS_RESOLVED, Void},
    },
    service::db::DbClient,
};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Sample messages triaged when `handle` is given none.
const SAMPLE_MESSAGES: [&str; 3] = [
    "Thanks for resolving my credit card issue.",
    "My debit card replacement still hasn't arrived.",
    "Could you check the status of ticket 650932?",
];

/// Support-triage – a banking support-message triage helper.
///
/// Configuration can come from `config.toml` or environment variables.
/// Every message is classified as positive feedback, negative feedback, or a query,
/// and answered with a short reply; complaints open a ticket.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the tool will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Export spans over OTLP/HTTP (endpoint from `OTEL_EXPORTER_OTLP_ENDPOINT`).
    #[arg(long)]
    otlp: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Triage messages and print the replies.
    Handle {
        /// Correlation token threaded through classification and replies.
        #[arg(long)]
        trace_id: Option<String>,
        /// Model to use instead of the configured ones.
        #[arg(long)]
        model: Option<String>,
        /// Messages to triage; built-in samples are used when none are given.
        messages: Vec<String>,
    },
    /// Print the status of a ticket.
    Status {
        /// Six-digit ticket number.
        ticket: String,
    },
    /// Mark a ticket as resolved.
    Resolve {
        /// Six-digit ticket number.
        ticket: String,
    },
    /// List all tickets.
    List,
}

/// Main entry point for the support-triage binary.
///
/// Sets up logging based on verbosity, loads configuration, and runs the command.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer, if asked for.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("support-triage");

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Handle { trace_id, model, messages } => {
            let messages = if messages.is_empty() { SAMPLE_MESSAGES.iter().map(|m| m.to_string()).collect() } else { messages };

            let replies = support_triage::start(config, &messages, trace_id.as_deref(), model.as_deref()).await?;

            for (message, reply) in messages.iter().zip(replies) {
                println!("\nUser: {message}");

                match reply {
                    Ok(reply) => println!("Agent: {reply}"),
                    Err(err) => println!("Error handling message: {err}"),
                }
            }
        }
        Command::Status { ticket } => {
            let db = DbClient::surreal(&config).await?;

            match db.get_ticket(&ticket).await? {
                Some(found) => println!("Ticket {}: {}\n\n{}", found.ticket_number, found.status, found.message),
                None => println!("Ticket {ticket} not found."),
            }
        }
        Command::Resolve { ticket } => {
            let db = DbClient::surreal(&config).await?;

            if db.update_ticket_status(&ticket, STATUS_RESOLVED).await? {
                println!("Ticket {ticket} marked {STATUS_RESOLVED}.");
            } else {
                return Err(anyhow::anyhow!("Ticket {ticket} not found."));
            }
        }
        Command::List => {
            let db = DbClient::surreal(&config).await?;

            for ticket in db.list_tickets().await? {
                println!("{}\t{}\t{}", ticket.ticket_number, ticket.status, ticket.message);
            }
        }
    }

    Ok(())
}
