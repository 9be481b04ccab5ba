//! Scan-session state machine.
//!
//! A session moves `idle -> scanning -> idle`: entered by an explicit start,
//! exited by an explicit stop, by the first accepted decode (auto-stop
//! before redemption runs), or by teardown. The continuous decoder keeps
//! firing after a hit; [`ScanSession::accept_decode`] is what turns that
//! stream into at most one redemption per scanning interval.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::source::{CameraLease, ScanSource};
use super::ScanError;
use crate::models::Ticket;
use crate::service::RedeemOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Scanning,
}

/// What the operator sees after a decode or manual entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanResult {
    Ok { message: String, ticket: Ticket },
    Used { message: String, ticket: Ticket },
    NotFound { message: String },
    Error { message: String },
}

impl ScanResult {
    pub fn message(&self) -> &str {
        match self {
            ScanResult::Ok { message, .. }
            | ScanResult::Used { message, .. }
            | ScanResult::NotFound { message }
            | ScanResult::Error { message } => message,
        }
    }
}

impl From<RedeemOutcome> for ScanResult {
    fn from(outcome: RedeemOutcome) -> Self {
        let message = outcome.message();
        match outcome {
            RedeemOutcome::Redeemed { ticket } => ScanResult::Ok { message, ticket },
            RedeemOutcome::AlreadyUsed { ticket } => ScanResult::Used { message, ticket },
            RedeemOutcome::NotFound { .. } => ScanResult::NotFound { message },
        }
    }
}

pub struct ScanSession {
    state: SessionState,
    source: Box<dyn ScanSource>,
    last_result: Option<ScanResult>,
}

impl ScanSession {
    pub fn new(source: Box<dyn ScanSource>) -> Self {
        Self {
            state: SessionState::Idle,
            source,
            last_result: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Enter `scanning`. Clears the previous result. If the source fails to
    /// start, the session stays idle and the source is released.
    pub fn start(&mut self) -> Result<(), ScanError> {
        if self.state == SessionState::Scanning {
            return Err(ScanError::AlreadyScanning);
        }
        self.last_result = None;
        if let Err(e) = self.source.start() {
            self.source.clear();
            return Err(e);
        }
        self.state = SessionState::Scanning;
        Ok(())
    }

    /// Explicit stop: release the source and return to `idle`.
    pub fn stop(&mut self) {
        self.source.stop();
        self.source.clear();
        self.state = SessionState::Idle;
    }

    /// Continuous-decode callback. Returns the payload to act on for the
    /// first decode of a scanning session; `None` for decodes arriving while
    /// idle, which are expected and ignored. Stops the source before
    /// handing the payload back, so redemption runs with the camera down.
    pub fn accept_decode(&mut self, decoded: &str) -> Option<String> {
        if self.state != SessionState::Scanning {
            return None;
        }
        self.source.stop();
        self.state = SessionState::Idle;
        Some(decoded.to_string())
    }

    pub fn record_result(&mut self, result: ScanResult) {
        self.last_result = Some(result);
    }

    pub fn clear_result(&mut self) {
        self.last_result = None;
    }

    pub fn last_result(&self) -> Option<&ScanResult> {
        self.last_result.as_ref()
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // Teardown must never leak an active capture handle.
        self.source.stop();
        self.source.clear();
    }
}

/// Live sessions keyed by id. Closing a session drops it, which releases
/// its source.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, ScanSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session around a fresh camera lease and start it.
    pub async fn open(&self) -> Result<Uuid, ScanError> {
        let mut session = ScanSession::new(Box::new(CameraLease::new()));
        session.start()?;
        let id = Uuid::new_v4();
        self.sessions.lock().await.insert(id, session);
        Ok(id)
    }

    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ScanSession) -> R,
    ) -> Result<R, ScanError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(ScanError::UnknownSession)?;
        Ok(f(session))
    }

    pub async fn close(&self, id: Uuid) -> Result<(), ScanError> {
        self.sessions
            .lock()
            .await
            .remove(&id)
            .map(drop)
            .ok_or(ScanError::UnknownSession)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
