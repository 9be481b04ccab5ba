use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{health_check, scan, tickets};
use crate::scan::SessionRegistry;
use crate::service::TicketService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TicketService>,
    pub scanners: Arc<SessionRegistry>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/tickets",
            get(tickets::list_tickets)
                .post(tickets::add_ticket)
                .delete(tickets::delete_all_tickets),
        )
        .route("/api/tickets/refresh", post(tickets::refresh_tickets))
        .route("/api/tickets/import", post(tickets::import_tickets))
        .route("/api/tickets/export", get(tickets::export_tickets))
        .route("/api/tickets/:ticket_id", delete(tickets::delete_ticket))
        .route("/api/tickets/:ticket_id/status", patch(tickets::toggle_status))
        .route("/api/redeem", post(scan::redeem_manual))
        .route("/api/scan/sessions", post(scan::open_scan_session))
        .route(
            "/api/scan/sessions/:session_id",
            get(scan::scan_session_status).delete(scan::close_scan_session),
        )
        .route(
            "/api/scan/sessions/:session_id/start",
            post(scan::start_scan_session),
        )
        .route(
            "/api/scan/sessions/:session_id/stop",
            post(scan::stop_scan_session),
        )
        .route(
            "/api/scan/sessions/:session_id/decode",
            post(scan::submit_decode),
        )
        .route(
            "/api/scan/sessions/:session_id/result",
            delete(scan::clear_scan_result),
        )
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
