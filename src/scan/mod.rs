//! QR scanning: payload-to-ticket-id extraction and the scan-session state
//! machine. The camera itself lives on the operator device; the session owns
//! a [`ScanSource`] lease and guarantees it is released on every exit path.

use thiserror::Error;

pub mod payload;
pub mod session;
pub mod source;

pub use payload::extract_ticket_id;
pub use session::{ScanResult, ScanSession, SessionRegistry, SessionState};
pub use source::{CameraLease, ScanSource};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan session is already running")]
    AlreadyScanning,

    #[error("scan source is unavailable: {0}")]
    SourceUnavailable(String),

    #[error("unknown scan session")]
    UnknownSession,
}
