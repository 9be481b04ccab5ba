//! In-memory `TicketStore` used as the test double for the service and scan
//! flows. A `BTreeMap` keyed on `ticket_id` gives the ordered listing for
//! free; `fail_with` injects a backend failure into the next operations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{StoreError, TicketStore};
use crate::models::{Ticket, TicketStatus};

#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<BTreeMap<String, Ticket>>,
    failure: Mutex<Option<String>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `message` until
    /// [`clear_failure`](Self::clear_failure) is called.
    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_string());
    }

    pub async fn clear_failure(&self) {
        *self.failure.lock().await = None;
    }

    pub async fn len(&self) -> usize {
        self.tickets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tickets.lock().await.is_empty()
    }

    async fn check_failure(&self) -> Result<(), StoreError> {
        match self.failure.lock().await.as_ref() {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn all_ordered(&self) -> Result<Vec<Ticket>, StoreError> {
        self.check_failure().await?;
        Ok(self.tickets.lock().await.values().cloned().collect())
    }

    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        self.check_failure().await?;
        Ok(self.tickets.lock().await.get(ticket_id).cloned())
    }

    async fn upsert_many(&self, tickets: &[Ticket]) -> Result<(), StoreError> {
        self.check_failure().await?;
        let mut map = self.tickets.lock().await;
        for ticket in tickets {
            map.insert(ticket.ticket_id.clone(), ticket.clone());
        }
        Ok(())
    }

    async fn set_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        used_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Ticket>, StoreError> {
        self.check_failure().await?;
        let mut map = self.tickets.lock().await;
        Ok(map.get_mut(ticket_id).map(|ticket| {
            ticket.status = status;
            ticket.used_at = used_at;
            ticket.clone()
        }))
    }

    async fn redeem_unused(
        &self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, StoreError> {
        self.check_failure().await?;
        let mut map = self.tickets.lock().await;
        match map.get_mut(ticket_id) {
            Some(ticket) if ticket.status == TicketStatus::Unused => {
                ticket.status = TicketStatus::Used;
                ticket.used_at = Some(now);
                Ok(Some(ticket.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, ticket_id: &str) -> Result<bool, StoreError> {
        self.check_failure().await?;
        Ok(self.tickets.lock().await.remove(ticket_id).is_some())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.check_failure().await?;
        let mut map = self.tickets.lock().await;
        let count = map.len() as u64;
        map.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: &str) -> Ticket {
        Ticket::new(
            id.to_string(),
            String::new(),
            String::new(),
            TicketStatus::Unused,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn listing_is_ordered_by_id() {
        let store = MemoryTicketStore::new();
        store
            .upsert_many(&[ticket("B"), ticket("A"), ticket("C")])
            .await
            .unwrap();
        let ids: Vec<_> = store
            .all_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.ticket_id)
            .collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn upsert_overwrites_whole_row() {
        let store = MemoryTicketStore::new();
        let mut first = ticket("A");
        first.name = "Old".into();
        store.upsert_many(&[first]).await.unwrap();

        let replacement = ticket("A");
        store.upsert_many(&[replacement]).await.unwrap();

        let stored = store.get("A").await.unwrap().unwrap();
        assert_eq!(stored.name, "");
    }

    #[tokio::test]
    async fn redeem_unused_is_conditional() {
        let store = MemoryTicketStore::new();
        store.upsert_many(&[ticket("A")]).await.unwrap();
        let now = Utc::now();

        let first = store.redeem_unused("A", now).await.unwrap();
        assert!(first.is_some());

        let second = store.redeem_unused("A", Utc::now()).await.unwrap();
        assert!(second.is_none(), "a used ticket must not redeem again");
        assert_eq!(store.get("A").await.unwrap().unwrap().used_at, Some(now));
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_backend_error() {
        let store = MemoryTicketStore::new();
        store.fail_with("connection reset").await;
        let err = store.all_ordered().await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        store.clear_failure().await;
        assert!(store.all_ordered().await.is_ok());
    }
}
