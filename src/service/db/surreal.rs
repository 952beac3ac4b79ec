//! SurrealDB implementation of the ticket store.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    RecordId, Surreal,
    engine::local::{Db, Mem, SurrealKv},
};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{Err, Res, Ticket, TriageError, Void},
};

use super::{DbClient, GenericDbClient};

const TICKET_TABLE: &str = "support_ticket";

/// Idempotent schema definition.
const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS support_ticket SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS ticket_number ON support_ticket TYPE string;
    DEFINE FIELD IF NOT EXISTS status ON support_ticket TYPE string;
    DEFINE FIELD IF NOT EXISTS message ON support_ticket TYPE string;
    DEFINE INDEX IF NOT EXISTS support_ticket_number ON support_ticket FIELDS ticket_number UNIQUE;
"#;

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Open the store described by the configuration.
    ///
    /// A `db_path` of `memory` gives an in-process store; anything else is an on-disk location.
    pub async fn surreal(config: &Config) -> Res<Self> {
        if config.db_path == "memory" {
            Self::surreal_memory().await
        } else {
            Self::surreal_file(&config.db_path).await
        }
    }

    /// Open an in-memory store (useful for tests).
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::memory().await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Open (or create) an on-disk store at `path`.
    pub async fn surreal_file(path: impl AsRef<Path>) -> Res<Self> {
        let client = SurrealDbClient::file(path.as_ref()).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Records.

/// A ticket record in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurrealTicket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub ticket_number: String,
    pub status: String,
    pub message: String,
}

impl From<SurrealTicket> for Ticket {
    fn from(record: SurrealTicket) -> Self {
        Self {
            ticket_number: record.ticket_number,
            status: record.status,
            message: record.message,
        }
    }
}

// Client.

/// SurrealDB ticket store.
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Db>,
}

impl SurrealDbClient {
    #[instrument(name = "SurrealDbClient::memory", skip_all)]
    pub async fn memory() -> Res<Self> {
        let db = Surreal::new::<Mem>(()).await.map_err(storage_err)?;

        Self::initialize(db).await
    }

    #[instrument(name = "SurrealDbClient::file", skip_all, fields(path = %path.display()))]
    pub async fn file(path: &Path) -> Res<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| TriageError::StorageUnavailable(format!("Cannot create `{}`: {err}", parent.display())))?;
        }

        let db = Surreal::new::<SurrealKv>(path.to_string_lossy().into_owned()).await.map_err(storage_err)?;

        Self::initialize(db).await
    }

    async fn initialize(db: Surreal<Db>) -> Res<Self> {
        db.use_ns("support").use_db("triage").await.map_err(storage_err)?;

        let client = Self { db };
        client.define_schema().await?;

        info!("Ticket store initialized successfully.");

        Ok(client)
    }

    /// Create the ticket schema if absent; safe to call repeatedly.
    #[instrument(name = "SurrealDbClient::define_schema", skip_all)]
    pub async fn define_schema(&self) -> Void {
        self.db.query(SCHEMA).await.map_err(storage_err)?.check().map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(name = "SurrealDbClient::create_ticket", skip(self, message))]
    async fn create_ticket(&self, ticket_number: &str, message: &str, status: &str) -> Void {
        let record = SurrealTicket {
            id: None,
            ticket_number: ticket_number.to_string(),
            status: status.to_string(),
            message: message.to_string(),
        };

        let _: Option<SurrealTicket> = self.db.upsert((TICKET_TABLE, ticket_number)).content(record).await.map_err(storage_err)?;

        info!("Ticket `{ticket_number}` stored with status `{status}`.");

        Ok(())
    }

    #[instrument(name = "SurrealDbClient::create_ticket_if_absent", skip(self, message))]
    async fn create_ticket_if_absent(&self, ticket_number: &str, message: &str, status: &str) -> Res<bool> {
        let record = SurrealTicket {
            id: None,
            ticket_number: ticket_number.to_string(),
            status: status.to_string(),
            message: message.to_string(),
        };

        // `CREATE` refuses an existing record id, so the check and the write cannot interleave.
        let created: Result<Option<SurrealTicket>, surrealdb::Error> = self.db.create((TICKET_TABLE, ticket_number)).content(record).await;

        match created {
            Ok(_) => {
                info!("Ticket `{ticket_number}` created with status `{status}`.");
                Ok(true)
            }
            Err(surrealdb::Error::Db(surrealdb::error::Db::RecordExists { .. })) => {
                debug!("Ticket `{ticket_number}` already exists.");
                Ok(false)
            }
            Err(err) => Err(storage_err(err)),
        }
    }

    #[instrument(name = "SurrealDbClient::get_ticket_status", skip(self))]
    async fn get_ticket_status(&self, ticket_number: &str) -> Res<Option<String>> {
        Ok(self.get_ticket(ticket_number).await?.map(|ticket| ticket.status))
    }

    #[instrument(name = "SurrealDbClient::get_ticket", skip(self))]
    async fn get_ticket(&self, ticket_number: &str) -> Res<Option<Ticket>> {
        let record: Option<SurrealTicket> = self.db.select((TICKET_TABLE, ticket_number)).await.map_err(storage_err)?;

        if record.is_none() {
            debug!("Ticket `{ticket_number}` not found.");
        }

        Ok(record.map(Ticket::from))
    }

    #[instrument(name = "SurrealDbClient::update_ticket_status", skip(self))]
    async fn update_ticket_status(&self, ticket_number: &str, status: &str) -> Res<bool> {
        let mut response = self
            .db
            .query("UPDATE type::thing($table, $ticket_number) SET status = $status")
            .bind(("table", TICKET_TABLE))
            .bind(("ticket_number", ticket_number.to_string()))
            .bind(("status", status.to_string()))
            .await
            .map_err(storage_err)?;

        let updated: Vec<SurrealTicket> = response.take(0).map_err(storage_err)?;

        Ok(!updated.is_empty())
    }

    #[instrument(name = "SurrealDbClient::list_tickets", skip(self))]
    async fn list_tickets(&self) -> Res<Vec<Ticket>> {
        let records: Vec<SurrealTicket> = self.db.select(TICKET_TABLE).await.map_err(storage_err)?;

        let mut tickets = records.into_iter().map(Ticket::from).collect::<Vec<_>>();
        tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));

        Ok(tickets)
    }
}

fn storage_err(err: surrealdb::Error) -> Err {
    TriageError::StorageUnavailable(err.to_string()).into()
}
