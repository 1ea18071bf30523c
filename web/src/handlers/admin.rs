//! Staff-facing queue management endpoints.

use crate::{AppState, WebResult};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use take_a_number_core::{TicketId, TicketNumber, TicketView};

/// Response of `GET /admin/tickets`.
#[derive(Debug, Serialize)]
pub struct ActiveTicketsResponse {
    /// Pending, unexpired tickets in ascending number order.
    pub tickets: Vec<TicketView>,
    /// Number of tickets listed.
    pub count: usize,
}

/// Response of `POST /admin/reset`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    /// Tickets deleted by the reset.
    pub tickets_cleared: u64,
    /// Number the next request will receive.
    pub next_number: String,
    /// When the reset happened.
    pub reset_at: DateTime<Utc>,
}

/// Query of `POST /admin/cleanup`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupParams {
    /// Age threshold; the configured default when absent.
    pub max_age_hours: Option<u32>,
}

/// Response of `POST /admin/cleanup`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    /// Tickets deleted.
    pub deleted_count: u64,
    /// Threshold that was applied.
    pub max_age_hours: i64,
}

/// Response of `GET /admin/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// All stored tickets.
    pub total: u64,
    /// Pending tickets, including any that ran out but were not read since.
    pub pending: u64,
    /// Completed tickets.
    pub completed: u64,
    /// Expired tickets.
    pub expired: u64,
    /// When the counts were taken.
    pub timestamp: DateTime<Utc>,
}

/// List the active queue.
///
/// # Endpoint
///
/// ```text
/// GET /admin/tickets
/// ```
///
/// # Errors
///
/// Returns 500 on storage failure.
pub async fn list_tickets(State(state): State<AppState>) -> WebResult<Json<ActiveTicketsResponse>> {
    let tickets: Vec<TicketView> = state
        .tickets
        .list_active()
        .await?
        .iter()
        .map(|ticket| state.tickets.view(ticket))
        .collect();

    Ok(Json(ActiveTicketsResponse {
        count: tickets.len(),
        tickets,
    }))
}

/// Mark a pending ticket as served.
///
/// # Endpoint
///
/// ```text
/// PUT /admin/tickets/:id/complete
/// ```
///
/// # Errors
///
/// - 400: the id is not an integer
/// - 404 `TICKET_NOT_FOUND`: no such ticket
/// - 409 `INVALID_TRANSITION`: the ticket is not pending
pub async fn complete_ticket(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> WebResult<Json<TicketView>> {
    let Path(id) = id?;

    let ticket = state.tickets.complete_ticket(TicketId::new(id)).await?;
    Ok(Json(state.tickets.view(&ticket)))
}

/// Delete every ticket and restart numbering.
///
/// # Endpoint
///
/// ```text
/// POST /admin/reset
/// ```
///
/// # Errors
///
/// Returns 500 on storage failure; nothing is changed in that case.
pub async fn reset(State(state): State<AppState>) -> WebResult<Json<ResetResponse>> {
    let tickets_cleared = state.tickets.reset_all().await?;

    Ok(Json(ResetResponse {
        tickets_cleared,
        next_number: TicketNumber::FIRST.to_string(),
        reset_at: state.tickets.now(),
    }))
}

/// Purge tickets older than a threshold, whatever their status.
///
/// # Endpoint
///
/// ```text
/// POST /admin/cleanup?maxAgeHours=24
/// ```
///
/// # Errors
///
/// - 400: `maxAgeHours` is not a non-negative integer
/// - 500: storage failure
pub async fn cleanup(
    State(state): State<AppState>,
    params: Result<Query<CleanupParams>, QueryRejection>,
) -> WebResult<Json<CleanupResponse>> {
    let Query(params) = params?;

    let deleted_count = state.tickets.cleanup_expired(params.max_age_hours).await?;
    let max_age_hours = params.max_age_hours.map_or(
        state.tickets.config().cleanup_max_age_hours,
        i64::from,
    );

    Ok(Json(CleanupResponse {
        deleted_count,
        max_age_hours,
    }))
}

/// Counts by status.
///
/// # Endpoint
///
/// ```text
/// GET /admin/stats
/// ```
///
/// # Errors
///
/// Returns 500 on storage failure.
pub async fn stats(State(state): State<AppState>) -> WebResult<Json<StatsResponse>> {
    let stats = state.tickets.stats().await?;

    Ok(Json(StatsResponse {
        total: stats.total,
        pending: stats.pending,
        completed: stats.completed,
        expired: stats.expired,
        timestamp: state.tickets.now(),
    }))
}

