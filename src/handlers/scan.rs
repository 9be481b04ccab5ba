use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::routes::AppState;
use crate::scan::{extract_ticket_id, ScanResult, SessionState};
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Deserialize)]
pub struct ManualRedeem {
    pub ticket_id: String,
}

#[derive(Deserialize)]
pub struct DecodeBody {
    pub text: String,
}

/// Manual entry: the id is used as typed (trimmed), with no URL extraction.
pub async fn redeem_manual(
    State(state): State<AppState>,
    Json(body): Json<ManualRedeem>,
) -> Result<Response, AppError> {
    let ticket_id = body.ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(AppError::Validation("A ticket id is required".to_string()));
    }
    let outcome = state.service.redeem(ticket_id).await?;
    let message = outcome.message();
    Ok(success(ScanResult::from(outcome), message).into_response())
}

/// Create a session around a fresh camera lease and start scanning.
pub async fn open_scan_session(State(state): State<AppState>) -> Result<Response, AppError> {
    let session_id = state.scanners.open().await?;
    Ok(success(
        json!({ "session_id": session_id, "state": SessionState::Scanning }),
        "Scan session started",
    )
    .into_response())
}

pub async fn scan_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (session_state, result) = state
        .scanners
        .with_session(session_id, |s| (s.state(), s.last_result().cloned()))
        .await?;
    Ok(success(
        json!({ "state": session_state, "result": result }),
        "Scan session",
    )
    .into_response())
}

/// Re-enter scanning on an idle session ("scan next").
pub async fn start_scan_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state
        .scanners
        .with_session(session_id, |s| s.start())
        .await??;
    Ok(success(json!({ "state": SessionState::Scanning }), "Scanning").into_response())
}

pub async fn stop_scan_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.scanners.with_session(session_id, |s| s.stop()).await?;
    Ok(success(json!({ "state": SessionState::Idle }), "Scanning stopped").into_response())
}

/// The continuous-decode callback. The session decides whether this decode
/// is the one that gets acted on; repeats and late decodes are ignored.
pub async fn submit_decode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<DecodeBody>,
) -> Result<Response, AppError> {
    let accepted = state
        .scanners
        .with_session(session_id, |s| s.accept_decode(&body.text))
        .await?;

    let Some(payload) = accepted else {
        return Ok(success(
            json!({ "acted": false }),
            "Decode ignored; session is not scanning",
        )
        .into_response());
    };

    let result = match extract_ticket_id(&payload) {
        None => ScanResult::Error {
            message: "Could not read a ticket id from the scanned code".to_string(),
        },
        Some(ticket_id) => match state.service.redeem(&ticket_id).await {
            Ok(outcome) => ScanResult::from(outcome),
            Err(e) => {
                tracing::error!(error = ?e, "Redemption failed during scan");
                ScanResult::Error {
                    message: "Redemption failed; the ticket store is unavailable".to_string(),
                }
            }
        },
    };

    // The session may have been closed while redemption ran; the result is
    // still returned to the caller either way.
    let _ = state
        .scanners
        .with_session(session_id, |s| s.record_result(result.clone()))
        .await;

    let message = result.message().to_string();
    Ok(success(json!({ "acted": true, "result": result }), message).into_response())
}

/// Clear the operator-facing message box.
pub async fn clear_scan_result(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state
        .scanners
        .with_session(session_id, |s| s.clear_result())
        .await?;
    Ok(empty_success("Message cleared").into_response())
}

/// Tear the session down, releasing its source.
pub async fn close_scan_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.scanners.close(session_id).await?;
    Ok(empty_success("Scan session closed").into_response())
}
