pub mod ticket;

pub use ticket::{normalize_id, normalize_status, Ticket, TicketDraft, TicketStatus};
