use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use talad_catalog::seed::{section_location, section_price_satang, DEFAULT_LOT_SIZE};
use talad_catalog::{Lot, LotPatch, LotStatus, Section, ZoneType};
use talad_core::reporting::LotDetail;
use talad_core::repository::LotFilter;
use talad_shared::{PageRequest, Paged};

use crate::error::{parse_query_filter, AppError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListLotsQuery {
    pub status: Option<String>,
    pub section: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLotRequest {
    pub lot_number: String,
    pub section: Section,
    pub zone_type: Option<ZoneType>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub price_satang: Option<i64>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/lots", get(list_lots))
        .route("/v1/lots/{id}", get(get_lot))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/lots", post(create_lot))
        .route("/v1/lots/{id}", patch(update_lot).delete(delete_lot))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/lots
/// List lots, optionally filtered by status and section
async fn list_lots(
    State(state): State<AppState>,
    Query(query): Query<ListLotsQuery>,
) -> Result<Json<Paged<Lot>>, AppError> {
    let filter = LotFilter {
        status: parse_query_filter::<LotStatus>(query.status.as_deref())?,
        section: parse_query_filter::<Section>(query.section.as_deref())?,
    };
    let page = PageRequest::new(query.page, query.limit);

    let lots = state
        .reporting
        .list_lots(&filter, page)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(lots))
}

/// GET /v1/lots/:id
/// Retrieve one lot together with its active booking, if any
async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> Result<Json<LotDetail>, AppError> {
    let detail = state
        .reporting
        .get_lot(lot_id)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(detail))
}

/// POST /v1/lots
/// Create a lot; omitted attributes fall back to the section defaults
async fn create_lot(
    State(state): State<AppState>,
    Json(req): Json<CreateLotRequest>,
) -> Result<(StatusCode, Json<Lot>), AppError> {
    let CreateLotRequest {
        lot_number,
        section,
        zone_type,
        location,
        size,
        price_satang,
    } = req;

    let lot = Lot::new(
        lot_number,
        section,
        zone_type.unwrap_or(ZoneType::Standard),
        location.unwrap_or_else(|| section_location(section).to_string()),
        size.unwrap_or_else(|| DEFAULT_LOT_SIZE.to_string()),
        price_satang.unwrap_or_else(|| section_price_satang(section)),
    );

    let created = state
        .coordinator
        .create_lot(lot)
        .await
        .map_err(AppError::from_engine)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /v1/lots/:id
/// Update a lot's attributes; status may only toggle Available/Maintenance
async fn update_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(patch): Json<LotPatch>,
) -> Result<Json<Lot>, AppError> {
    let updated = state
        .coordinator
        .update_lot(lot_id, patch)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(updated))
}

/// DELETE /v1/lots/:id
/// Remove a lot that has no active booking
async fn delete_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .coordinator
        .delete_lot(lot_id)
        .await
        .map_err(AppError::from_engine)?;

    Ok(StatusCode::NO_CONTENT)
}
