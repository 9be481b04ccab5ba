use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Redemption state of a ticket. Stored as the Postgres enum `ticket_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
pub enum TicketStatus {
    Unused,
    Used,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Unused => "unused",
            TicketStatus::Used => "used",
        }
    }

    /// The administrative toggle: `unused <-> used`.
    pub fn toggled(self) -> Self {
        match self {
            TicketStatus::Unused => TicketStatus::Used,
            TicketStatus::Used => TicketStatus::Unused,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub ticket_id: String,
    pub name: String,
    pub email: String,
    pub status: TicketStatus,
    pub used_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Build a ticket from already-normalized parts, keeping the
    /// `used_at` set iff `status == used` invariant.
    pub fn new(
        ticket_id: String,
        name: String,
        email: String,
        status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let used_at = match status {
            TicketStatus::Used => Some(now),
            TicketStatus::Unused => None,
        };
        Self {
            ticket_id,
            name,
            email,
            status,
            used_at,
        }
    }

    /// Case-insensitive substring search across id, name, email and the
    /// status literal, matching the dashboard filter.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.ticket_id.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
            || self.status.as_str().contains(&needle)
    }
}

/// Manual-add request body. Name and email are optional display strings.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketDraft {
    pub ticket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Canonical ticket id: trimmed, case preserved. Empty means "no id" and the
/// caller rejects the row. Applied identically on import and manual add.
pub fn normalize_id(value: &str) -> String {
    value.trim().to_string()
}

/// Canonical status: a case-insensitive, whitespace-tolerant `"used"` maps to
/// `Used`; everything else, including the empty string, maps to `Unused`.
pub fn normalize_status(value: &str) -> TicketStatus {
    if value.trim().eq_ignore_ascii_case("used") {
        TicketStatus::Used
    } else {
        TicketStatus::Unused
    }
}
