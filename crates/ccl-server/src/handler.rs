use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use ccl_ledger::{ConversionStats, CreditConverter, CreditLedger, IntegrityReport, LedgerStats, Reading};
use ccl_types::LedgerEntry;

use crate::error::{ServerError, ServerResult};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedger>,
    pub converter: Arc<CreditConverter>,
}

impl AppState {
    pub fn new(ledger: Arc<CreditLedger>, converter: CreditConverter) -> Self {
        Self {
            ledger,
            converter: Arc::new(converter),
        }
    }
}

/// Service status.
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let metadata = state.ledger.metadata();
    Json(json!({
        "status": "online",
        "name": metadata.name,
        "description": metadata.description,
        "version": env!("CARGO_PKG_VERSION"),
        "ledgerVersion": metadata.version,
        "entries": state.ledger.len(),
        "algorithm": state.ledger.signer().algorithm().as_str(),
    }))
}

pub async fn list_entries(State(state): State<AppState>) -> Json<Value> {
    let entries = state.ledger.entries();
    Json(json!({ "count": entries.len(), "entries": entries }))
}

/// Append a raw payload. Appends block on fsync, so they run off the
/// async workers.
pub async fn add_entry(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<LedgerEntry>)> {
    let Json(payload) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let ledger = state.ledger.clone();
    let entry = tokio::task::spawn_blocking(move || ledger.add_entry(payload))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<LedgerEntry>> {
    state
        .ledger
        .entry(&id)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("entry not found: {id}")))
}

pub async fn device_entries(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Value> {
    let entries = state.ledger.entries_by_device(&device_id);
    Json(json!({ "deviceId": device_id, "count": entries.len(), "entries": entries }))
}

pub async fn verify(State(state): State<AppState>) -> Json<IntegrityReport> {
    Json(state.ledger.verify_integrity())
}

pub async fn stats(State(state): State<AppState>) -> Json<LedgerStats> {
    Json(state.ledger.stats())
}

pub async fn export(State(state): State<AppState>) -> ServerResult<impl IntoResponse> {
    let body = state.ledger.export()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=ledger-export.json"),
        ],
        body,
    ))
}

/// Convert a reading and record it.
pub async fn add_reading(
    State(state): State<AppState>,
    body: Result<Json<Reading>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<LedgerEntry>)> {
    let Json(reading) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let AppState { ledger, converter } = state;
    let entry = tokio::task::spawn_blocking(move || converter.process_reading(&ledger, &reading))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn conversion_stats(State(state): State<AppState>) -> Json<ConversionStats> {
    Json(state.converter.conversion_stats(&state.ledger))
}

pub async fn device_credits(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Value> {
    let total = state.converter.credits_by_device(&state.ledger, &device_id);
    Json(json!({ "deviceId": device_id, "totalCredits": total }))
}
