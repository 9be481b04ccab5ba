//! Persistence seam for the ticket table.
//!
//! Everything the service needs from a backend is the handful of operations
//! below; any store with a unique index on `ticket_id` can implement them.
//! `postgres` is the production backend, `memory` the test double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Ticket, TicketStatus};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    /// All tickets ordered by `ticket_id` ascending.
    async fn all_ordered(&self) -> Result<Vec<Ticket>, StoreError>;

    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError>;

    /// Insert-or-overwrite keyed on `ticket_id`. An existing row is replaced
    /// column-for-column, not merged.
    async fn upsert_many(&self, tickets: &[Ticket]) -> Result<(), StoreError>;

    /// Update status and `used_at` by id, returning the updated row.
    async fn set_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        used_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Conditional redemption: mark the ticket used iff it is currently
    /// unused, atomically. `None` means no row was in that state (absent or
    /// already used) and nothing was written.
    async fn redeem_unused(
        &self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Delete by id; `true` when a row was removed.
    async fn delete(&self, ticket_id: &str) -> Result<bool, StoreError>;

    /// Delete every ticket, returning the removed count.
    async fn delete_all(&self) -> Result<u64, StoreError>;
}
