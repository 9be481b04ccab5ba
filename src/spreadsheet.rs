//! Spreadsheet import/export for the ticket table.
//!
//! Import reads the first worksheet only and maps rows through a tolerant
//! header lookup (`ticketId`, `ticket_id`, `TICKET ID`, ... all resolve to
//! the same column). Rows without a resolvable, non-empty ticket id are
//! dropped silently. Export writes the fixed `ticketId`/`name`/`email`/
//! `status` column order to a `Tickets` sheet.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::Workbook;
use thiserror::Error;

use crate::models::{normalize_id, normalize_status, Ticket};

/// Export column order.
const COLUMNS: [&str; 4] = ["ticketId", "name", "email", "status"];

const EXPORT_SHEET: &str = "Tickets";

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("could not read workbook: {0}")]
    Decode(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("could not build workbook: {0}")]
    Encode(#[from] rust_xlsxwriter::XlsxError),
}

/// Decode the first worksheet into tickets.
///
/// `now` is the timestamp stamped into `used_at` for rows that import as
/// `used`, so one import shares a single instant.
pub fn read_tickets(bytes: &[u8], now: DateTime<Utc>) -> Result<Vec<Ticket>, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns = ColumnMap::from_headers(header_row);

    let mut tickets = Vec::new();
    for row in rows {
        let ticket_id = normalize_id(&columns.cell(row, columns.ticket_id));
        if ticket_id.is_empty() {
            continue;
        }
        let status = normalize_status(&columns.cell(row, columns.status));
        tickets.push(Ticket::new(
            ticket_id,
            columns.cell(row, columns.name),
            columns.cell(row, columns.email),
            status,
            now,
        ));
    }
    Ok(tickets)
}

/// Encode tickets into an `.xlsx` buffer.
pub fn write_workbook(tickets: &[Ticket]) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET)?;

    for (col, header) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (i, ticket) in tickets.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, ticket.ticket_id.as_str())?;
        sheet.write_string(row, 1, ticket.name.as_str())?;
        sheet.write_string(row, 2, ticket.email.as_str())?;
        sheet.write_string(row, 3, ticket.status.as_str())?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Resolved column indices for one sheet. `None` means the column is absent
/// and every lookup in it yields the empty string.
struct ColumnMap {
    ticket_id: Option<usize>,
    name: Option<usize>,
    email: Option<usize>,
    status: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &[Data]) -> Self {
        let mut map = Self {
            ticket_id: None,
            name: None,
            email: None,
            status: None,
        };
        for (idx, cell) in headers.iter().enumerate() {
            let slot = match fold_header(&cell_to_string(cell)).as_str() {
                "ticketid" => &mut map.ticket_id,
                "name" => &mut map.name,
                "email" => &mut map.email,
                "status" => &mut map.status,
                _ => continue,
            };
            // First matching header wins.
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
        map
    }

    fn cell(&self, row: &[Data], col: Option<usize>) -> String {
        col.and_then(|c| row.get(c))
            .map(cell_to_string)
            .unwrap_or_default()
    }
}

/// Canonicalize a header: lowercase, alphanumerics only. Makes `ticketId`,
/// `ticket_id`, `Ticket Id` and `TICKETID` the same key.
fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Stringify a cell the way a human reads it. Integral floats lose the
/// fraction so a numeric id cell `123` becomes `"123"`, not `"123.0"`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
