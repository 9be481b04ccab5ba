use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::models::TicketDraft;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{attachment, empty_success, success};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Deserialize)]
pub struct ListParams {
    q: Option<String>,
}

/// The dashboard table: cached tickets, optionally filtered by search text.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let tickets = state.service.tickets(params.q.as_deref()).await;
    let message = format!("{} tickets", tickets.len());
    success(tickets, message).into_response()
}

/// Re-fetch the cache from the store.
pub async fn refresh_tickets(State(state): State<AppState>) -> Result<Response, AppError> {
    let count = state.service.refresh().await?;
    Ok(success(json!({ "count": count }), "Ticket list reloaded").into_response())
}

pub async fn add_ticket(
    State(state): State<AppState>,
    Json(draft): Json<TicketDraft>,
) -> Result<Response, AppError> {
    let ticket = state.service.add(draft).await?;
    let message = format!("Ticket '{}' added", ticket.ticket_id);
    Ok(success(ticket, message).into_response())
}

/// Bulk import from an uploaded spreadsheet. Takes the `file` field of the
/// multipart body, or the first field when none is named that.
pub async fn import_tickets(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let is_file_field = field.name() == Some("file");
        let bytes = field.bytes().await.map_err(bad_upload)?;
        if is_file_field {
            data = Some(bytes);
            break;
        }
        if data.is_none() {
            data = Some(bytes);
        }
    }
    let data = data.ok_or_else(|| AppError::Validation("No file in upload".to_string()))?;

    let imported = state.service.import(&data).await?;
    Ok(success(
        json!({ "imported": imported }),
        format!("Imported/updated {} tickets", imported),
    )
    .into_response())
}

fn bad_upload(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload: {}", e))
}

pub async fn export_tickets(State(state): State<AppState>) -> Result<Response, AppError> {
    let bytes = state.service.export().await?;
    Ok(attachment(bytes, "tickets.xlsx", XLSX_MIME))
}

/// Administrative status toggle, including `used -> unused`.
pub async fn toggle_status(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = state.service.toggle_status(&ticket_id).await?;
    let message = format!(
        "Ticket '{}' is now {}",
        ticket.ticket_id,
        ticket.status.as_str()
    );
    Ok(success(ticket, message).into_response())
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    state.service.delete(&ticket_id).await?;
    Ok(empty_success(format!("Ticket '{}' deleted", ticket_id)).into_response())
}

pub async fn delete_all_tickets(State(state): State<AppState>) -> Result<Response, AppError> {
    let removed = state.service.delete_all().await?;
    Ok(success(
        json!({ "deleted": removed }),
        format!("Deleted {} tickets", removed),
    )
    .into_response())
}
