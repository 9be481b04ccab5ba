use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{StoreError, TicketStore};
use crate::models::{Ticket, TicketStatus};

const TICKET_COLUMNS: &str = "ticket_id, name, email, status, used_at";

pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn all_ordered(&self) -> Result<Vec<Ticket>, StoreError> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY ticket_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = $1"
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn upsert_many(&self, tickets: &[Ticket]) -> Result<(), StoreError> {
        // One transaction per batch so a failed bulk import leaves no
        // partial effect behind.
        let mut tx = self.pool.begin().await?;
        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets (ticket_id, name, email, status, used_at)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (ticket_id) DO UPDATE
                 SET name = EXCLUDED.name,
                     email = EXCLUDED.email,
                     status = EXCLUDED.status,
                     used_at = EXCLUDED.used_at",
            )
            .bind(&ticket.ticket_id)
            .bind(&ticket.name)
            .bind(&ticket.email)
            .bind(ticket.status)
            .bind(ticket.used_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        used_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET status = $2, used_at = $3
             WHERE ticket_id = $1
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket_id)
        .bind(status)
        .bind(used_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn redeem_unused(
        &self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        // The status guard in the WHERE clause is what makes two
        // near-simultaneous scans resolve to exactly one redemption.
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET status = 'used', used_at = $2
             WHERE ticket_id = $1 AND status = 'unused'
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn delete(&self, ticket_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tickets WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tickets")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
