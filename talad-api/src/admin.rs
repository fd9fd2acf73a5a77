use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use talad_booking::Booking;
use talad_core::reporting::DashboardStats;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub lots_created: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/seed", post(seed_market))
        .route("/v1/admin/dashboard", get(dashboard))
        .route("/v1/admin/search", get(search_vendors))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/admin/seed
/// Install the default market plan; refused while bookings exist
async fn seed_market(State(state): State<AppState>) -> Result<Json<SeedResponse>, AppError> {
    let lots = state
        .coordinator
        .seed_market()
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(SeedResponse {
        lots_created: lots.len(),
    }))
}

/// GET /v1/admin/dashboard
/// Occupancy, payment tallies, verified revenue and recent bookings
async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let stats = state
        .reporting
        .dashboard()
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(stats))
}

/// GET /v1/admin/search?q=
/// Substring search across vendor name, email and phone
async fn search_vendors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let hits = state
        .reporting
        .search_vendors(&query.q)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(hits))
}
