//! Customer-facing ticket endpoints.
//!
//! A client identifies itself with an opaque session token. It is returned
//! in every ticket body as `sessionToken` and sent back in the path.

use crate::{AppState, WebResult};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use serde::Deserialize;
use take_a_number_core::{SessionKey, TicketView};

/// Body of `POST /tickets`. The whole body is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    /// Session token from an earlier response, if the client has one.
    pub session_token: Option<String>,
}

/// Request a ticket.
///
/// Returns the session's pending ticket if it has one, otherwise issues the
/// next number. Without a token a new session is started.
///
/// # Endpoint
///
/// ```text
/// POST /tickets
/// { "sessionToken": "..." }   (optional)
/// ```
///
/// # Errors
///
/// - 400 `INVALID_SESSION_TOKEN`: blank or oversized token
/// - 500: storage failure
pub async fn create_ticket(
    State(state): State<AppState>,
    body: Option<Json<CreateTicketRequest>>,
) -> WebResult<Json<TicketView>> {
    let session_key = body
        .and_then(|Json(request)| request.session_token)
        .map(SessionKey::parse)
        .transpose()?;

    let ticket = state.tickets.request_ticket(session_key).await?;
    Ok(Json(state.tickets.view(&ticket)))
}

/// Read the session's ticket.
///
/// # Endpoint
///
/// ```text
/// GET /tickets/:token
/// ```
///
/// # Errors
///
/// - 404 `TICKET_NOT_FOUND`: no ticket for this session
/// - 410 `TICKET_EXPIRED` / `TICKET_COMPLETED`: the ticket is terminal
pub async fn get_ticket(
    State(state): State<AppState>,
    token: Result<Path<String>, PathRejection>,
) -> WebResult<Json<TicketView>> {
    let Path(token) = token?;
    let session_key = SessionKey::parse(token)?;

    tracing::debug!(session = session_key.redacted(), "Ticket lookup");
    let ticket = state.tickets.current_ticket(&session_key).await?;
    Ok(Json(state.tickets.view(&ticket)))
}

/// Cancel the session's pending ticket.
///
/// The ticket becomes `expired`; the body is the updated ticket.
///
/// # Endpoint
///
/// ```text
/// DELETE /tickets/:token
/// ```
///
/// # Errors
///
/// - 404 `TICKET_NOT_FOUND`: no ticket for this session
/// - 409 `INVALID_TRANSITION`: the ticket is not pending
pub async fn cancel_ticket(
    State(state): State<AppState>,
    token: Result<Path<String>, PathRejection>,
) -> WebResult<Json<TicketView>> {
    let Path(token) = token?;
    let session_key = SessionKey::parse(token)?;

    let ticket = state.tickets.cancel_ticket(&session_key).await?;
    Ok(Json(state.tickets.view(&ticket)))
}
