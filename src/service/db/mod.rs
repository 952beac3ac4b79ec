use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Ticket, Void};

pub mod surreal;

// Traits.

/// Generic ticket store trait that clients must implement.
///
/// The store exclusively owns ticket records; callers only request creates, reads, and
/// status changes by ticket number. Every failure of the underlying engine surfaces as
/// [`TriageError::StorageUnavailable`](crate::base::types::TriageError::StorageUnavailable).
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Creates a ticket, or overwrites the status and message of an existing one.
    ///
    /// Last writer wins; there is no optimistic concurrency.
    async fn create_ticket(&self, ticket_number: &str, message: &str, status: &str) -> Void;

    /// Creates a ticket only if no ticket with that number exists, in a single store operation.
    ///
    /// Returns `false`, leaving the existing ticket untouched, when the number is taken.
    async fn create_ticket_if_absent(&self, ticket_number: &str, message: &str, status: &str) -> Res<bool>;

    /// Gets the status of a ticket, or `None` when there is no such ticket.
    async fn get_ticket_status(&self, ticket_number: &str) -> Res<Option<String>>;

    /// Gets a full ticket record, or `None` when there is no such ticket.
    async fn get_ticket(&self, ticket_number: &str) -> Res<Option<Ticket>>;

    /// Changes the status of an existing ticket.
    ///
    /// Returns `false` (and creates nothing) when the ticket does not exist.
    async fn update_ticket_status(&self, ticket_number: &str, status: &str) -> Res<bool>;

    /// Lists every ticket, ordered by ticket number.
    async fn list_tickets(&self) -> Res<Vec<Ticket>>;
}

// Structs.

/// Ticket store client for support-triage.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    pub inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
