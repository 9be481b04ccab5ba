//! Ticket operations behind the HTTP surface.
//!
//! `TicketService` owns the in-memory ticket cache and the rules that keep it
//! honest: a full re-fetch after bulk writes (import, manual add), an
//! optimistic in-place patch for single-row changes (toggle, delete, redeem),
//! and a clear on delete-all. Listing and export serve the cache, so an
//! export can lag the store until the next refresh.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::models::{normalize_id, Ticket, TicketDraft, TicketStatus};
use crate::spreadsheet;
use crate::store::TicketStore;
use crate::utils::error::AppError;

/// Result of a redemption attempt. `used` and `notfound` are reportable
/// outcomes, not errors; only store failures escape as `Err`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RedeemOutcome {
    #[serde(rename = "ok")]
    Redeemed { ticket: Ticket },
    #[serde(rename = "used")]
    AlreadyUsed { ticket: Ticket },
    #[serde(rename = "notfound")]
    NotFound { ticket_id: String },
}

impl RedeemOutcome {
    pub fn message(&self) -> String {
        match self {
            RedeemOutcome::Redeemed { ticket } => format!("Redeemed ✅ {}", ticket.ticket_id),
            RedeemOutcome::AlreadyUsed { ticket } => format!("Already used: {}", ticket.ticket_id),
            RedeemOutcome::NotFound { ticket_id } => format!("Ticket not found: {}", ticket_id),
        }
    }
}

pub struct TicketService {
    store: Arc<dyn TicketStore>,
    cache: RwLock<Vec<Ticket>>,
    import_gate: Mutex<()>,
}

impl TicketService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(Vec::new()),
            import_gate: Mutex::new(()),
        }
    }

    /// Re-fetch the cache from the store, ordered by ticket id. Returns the
    /// ticket count.
    pub async fn refresh(&self) -> Result<usize, AppError> {
        let tickets = self.store.all_ordered().await?;
        let count = tickets.len();
        *self.cache.write().await = tickets;
        Ok(count)
    }

    /// The cached ticket list, optionally filtered by the dashboard search.
    pub async fn tickets(&self, query: Option<&str>) -> Vec<Ticket> {
        let cache = self.cache.read().await;
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => cache.iter().filter(|t| t.matches(q)).cloned().collect(),
            None => cache.clone(),
        }
    }

    /// Manual single add: upserts an `unused` ticket under the normalized id.
    pub async fn add(&self, draft: TicketDraft) -> Result<Ticket, AppError> {
        let ticket_id = normalize_id(&draft.ticket_id);
        if ticket_id.is_empty() {
            return Err(AppError::Validation("A ticket id is required".to_string()));
        }
        let ticket = Ticket::new(
            ticket_id,
            draft.name,
            draft.email,
            TicketStatus::Unused,
            Utc::now(),
        );
        self.store.upsert_many(std::slice::from_ref(&ticket)).await?;
        self.refresh().await?;
        Ok(ticket)
    }

    /// Bulk import from a spreadsheet upload. Rejects overlapping imports and
    /// uploads that yield zero valid rows; otherwise upserts every row and
    /// re-fetches the cache. Returns the imported row count.
    pub async fn import(&self, bytes: &[u8]) -> Result<usize, AppError> {
        let _gate = self.import_gate.try_lock().map_err(|_| {
            AppError::Conflict("An import is already in progress".to_string())
        })?;

        let rows = spreadsheet::read_tickets(bytes, Utc::now())?;
        if rows.is_empty() {
            return Err(AppError::Validation(
                "No valid rows found. Ensure the sheet has a 'ticketId' column".to_string(),
            ));
        }

        self.store.upsert_many(&rows).await?;
        self.refresh().await?;
        tracing::info!("Imported/updated {} tickets", rows.len());
        Ok(rows.len())
    }

    /// Encode the cached list as an `.xlsx` buffer. Served from the cache on
    /// purpose; see the module docs.
    pub async fn export(&self) -> Result<Vec<u8>, AppError> {
        let cache = self.cache.read().await;
        Ok(spreadsheet::write_workbook(&cache)?)
    }

    /// Administrative toggle: `unused -> used` stamps `used_at`,
    /// `used -> unused` clears it.
    pub async fn toggle_status(&self, ticket_id: &str) -> Result<Ticket, AppError> {
        let current = self
            .store
            .get(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket '{}' was not found", ticket_id)))?;

        let next = current.status.toggled();
        let used_at = match next {
            TicketStatus::Used => Some(Utc::now()),
            TicketStatus::Unused => None,
        };
        let updated = self
            .store
            .set_status(ticket_id, next, used_at)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket '{}' was not found", ticket_id)))?;

        self.patch_cache(&updated).await;
        Ok(updated)
    }

    pub async fn delete(&self, ticket_id: &str) -> Result<(), AppError> {
        if !self.store.delete(ticket_id).await? {
            return Err(AppError::NotFound(format!(
                "Ticket '{}' was not found",
                ticket_id
            )));
        }
        self.cache.write().await.retain(|t| t.ticket_id != ticket_id);
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<u64, AppError> {
        let removed = self.store.delete_all().await?;
        self.cache.write().await.clear();
        tracing::info!("Deleted all {} tickets", removed);
        Ok(removed)
    }

    /// The redemption state machine. The write is a conditional update at
    /// the store layer, so of two concurrent scans of a fresh ticket exactly
    /// one observes `ok` and the other `used`.
    pub async fn redeem(&self, ticket_id: &str) -> Result<RedeemOutcome, AppError> {
        let Some(current) = self.store.get(ticket_id).await? else {
            return Ok(RedeemOutcome::NotFound {
                ticket_id: ticket_id.to_string(),
            });
        };
        if current.status == TicketStatus::Used {
            return Ok(RedeemOutcome::AlreadyUsed { ticket: current });
        }

        if let Some(updated) = self.store.redeem_unused(ticket_id, Utc::now()).await? {
            self.patch_cache(&updated).await;
            return Ok(RedeemOutcome::Redeemed { ticket: updated });
        }

        // Lost the race between the read and the conditional write: someone
        // else redeemed or deleted the ticket in between.
        match self.store.get(ticket_id).await? {
            Some(ticket) => {
                self.patch_cache(&ticket).await;
                Ok(RedeemOutcome::AlreadyUsed { ticket })
            }
            None => Ok(RedeemOutcome::NotFound {
                ticket_id: ticket_id.to_string(),
            }),
        }
    }

    async fn patch_cache(&self, ticket: &Ticket) {
        let mut cache = self.cache.write().await;
        if let Some(slot) = cache.iter_mut().find(|t| t.ticket_id == ticket.ticket_id) {
            *slot = ticket.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryTicketStore;
    use rust_xlsxwriter::Workbook;

    fn service() -> (TicketService, Arc<MemoryTicketStore>) {
        let store = Arc::new(MemoryTicketStore::new());
        (TicketService::new(store.clone()), store)
    }

    fn sheet_bytes(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn draft(id: &str) -> TicketDraft {
        TicketDraft {
            ticket_id: id.to_string(),
            name: String::new(),
            email: String::new(),
        }
    }

    #[tokio::test]
    async fn import_skips_rows_without_an_id() {
        let (service, store) = service();
        let bytes = sheet_bytes(&[
            &["ticketId", "name", "status"],
            &["A1", "Jo", "unused"],
            &["", "Bad", ""],
        ]);

        let imported = service.import(&bytes).await.unwrap();
        assert_eq!(imported, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("A1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn import_with_no_valid_rows_writes_nothing() {
        let (service, store) = service();
        let bytes = sheet_bytes(&[&["name"], &["Jo"]]);

        let err = service.import(&bytes).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn overlapping_import_is_rejected() {
        let (service, _store) = service();
        let _held = service.import_gate.try_lock().unwrap();

        let bytes = sheet_bytes(&[&["ticketId"], &["A1"]]);
        let err = service.import(&bytes).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn import_then_export_round_trips() {
        let (service, _store) = service();
        let bytes = sheet_bytes(&[
            &["ticketId", "name", "email", "status"],
            &["A1", "Jo", "jo@x.test", "unused"],
            &["B2", "Sam", "sam@x.test", "used"],
        ]);
        service.import(&bytes).await.unwrap();

        let exported = service.export().await.unwrap();
        let reread = spreadsheet::read_tickets(&exported, Utc::now()).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread[0].ticket_id, "A1");
        assert_eq!(reread[1].ticket_id, "B2");
        assert_eq!(reread[1].status, TicketStatus::Used);
    }

    #[tokio::test]
    async fn export_serves_the_cache_not_the_store() {
        let (service, store) = service();
        let ticket = Ticket::new(
            "GHOST".into(),
            String::new(),
            String::new(),
            TicketStatus::Unused,
            Utc::now(),
        );
        // Written behind the service's back, so the cache is stale.
        store.upsert_many(&[ticket]).await.unwrap();

        let exported = service.export().await.unwrap();
        let reread = spreadsheet::read_tickets(&exported, Utc::now()).unwrap();
        assert!(reread.is_empty());

        service.refresh().await.unwrap();
        let exported = service.export().await.unwrap();
        let reread = spreadsheet::read_tickets(&exported, Utc::now()).unwrap();
        assert_eq!(reread.len(), 1);
    }

    #[tokio::test]
    async fn add_requires_a_non_empty_id() {
        let (service, store) = service();
        let err = service.add(draft("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn add_normalizes_the_id_and_starts_unused() {
        let (service, store) = service();
        let ticket = service.add(draft("  T1  ")).await.unwrap();
        assert_eq!(ticket.ticket_id, "T1");
        assert_eq!(ticket.status, TicketStatus::Unused);
        assert!(ticket.used_at.is_none());
        assert!(store.get("T1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn search_filters_the_cached_list() {
        let (service, _store) = service();
        service.add(draft("VIP-1")).await.unwrap();
        service.add(draft("GA-1")).await.unwrap();

        let hits = service.tickets(Some("vip")).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ticket_id, "VIP-1");

        assert_eq!(service.tickets(None).await.len(), 2);
        assert_eq!(service.tickets(Some("  ")).await.len(), 2);
    }

    #[tokio::test]
    async fn toggle_flips_status_and_used_at_together() {
        let (service, _store) = service();
        service.add(draft("A1")).await.unwrap();

        let used = service.toggle_status("A1").await.unwrap();
        assert_eq!(used.status, TicketStatus::Used);
        assert!(used.used_at.is_some());

        let unused = service.toggle_status("A1").await.unwrap();
        assert_eq!(unused.status, TicketStatus::Unused);
        assert!(unused.used_at.is_none());
    }

    #[tokio::test]
    async fn toggle_unknown_ticket_is_not_found() {
        let (service, _store) = service();
        let err = service.toggle_status("ZZZ").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn redeem_is_idempotent() {
        let (service, _store) = service();
        service.add(draft("A1")).await.unwrap();

        let first = service.redeem("A1").await.unwrap();
        let stamped = match &first {
            RedeemOutcome::Redeemed { ticket } => ticket.used_at.unwrap(),
            other => panic!("expected ok, got {:?}", other),
        };

        let second = service.redeem("A1").await.unwrap();
        match second {
            RedeemOutcome::AlreadyUsed { ticket } => {
                assert_eq!(ticket.used_at, Some(stamped), "used_at must not re-stamp");
            }
            other => panic!("expected used, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn redeem_unknown_ticket_reports_notfound_without_writing() {
        let (service, store) = service();
        service.add(draft("A1")).await.unwrap();

        let outcome = service.redeem("ZZZ").await.unwrap();
        assert!(matches!(outcome, RedeemOutcome::NotFound { .. }));
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get("A1").await.unwrap().unwrap().status,
            TicketStatus::Unused
        );
    }

    #[tokio::test]
    async fn redeem_surfaces_store_failures_as_errors() {
        let (service, store) = service();
        service.add(draft("A1")).await.unwrap();
        store.fail_with("connection reset").await;

        let err = service.redeem("A1").await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn delete_and_delete_all_update_the_cache() {
        let (service, store) = service();
        service.add(draft("A1")).await.unwrap();
        service.add(draft("B2")).await.unwrap();

        service.delete("A1").await.unwrap();
        assert_eq!(service.tickets(None).await.len(), 1);

        let removed = service.delete_all().await.unwrap();
        assert_eq!(removed, 1);
        assert!(service.tickets(None).await.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_unknown_ticket_is_not_found() {
        let (service, _store) = service();
        let err = service.delete("ZZZ").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
