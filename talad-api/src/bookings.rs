use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use talad_booking::{
    Booking, BookingStatus, PaymentMethod, PaymentStatus, StallPeriod, Vendor,
};
use talad_core::reporting::{BookingDetail, BookingWithLot};
use talad_core::repository::BookingFilter;
use talad_core::reservation::BookingRequest;
use talad_core::verification::{VerificationOutcome, VerifyDecision};
use talad_shared::{PageRequest, Paged};

use crate::error::{parse_query_filter, AppError};
use crate::middleware::auth::AdminClaims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub lot_id: Uuid,
    pub vendor_name: String,
    pub vendor_phone: String,
    pub vendor_email: String,
    pub business_type: String,
    pub business_description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub phone: Option<String>,
    pub lot_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitSlipRequest {
    pub slip_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub approve: bool,
    pub method: Option<PaymentMethod>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings).post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/slip", post(submit_slip))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/verify", post(verify_payment))
        .route("/v1/bookings/{id}", delete(delete_booking))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/bookings
/// Open a booking on an available lot; claims the lot atomically
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request = BookingRequest {
        lot_id: req.lot_id,
        vendor: Vendor::new(
            req.vendor_name,
            req.vendor_phone,
            req.vendor_email,
            req.business_type,
            req.business_description,
        ),
        period: StallPeriod::new(req.start_date, req.end_date),
        notes: req.notes,
    };

    let booking = state
        .coordinator
        .create_booking(request)
        .await
        .map_err(AppError::from_engine)?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings
/// List bookings with their lots; phone matches as a substring
async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Paged<BookingWithLot>>, AppError> {
    let filter = BookingFilter {
        status: parse_query_filter::<BookingStatus>(query.status.as_deref())?,
        payment_status: parse_query_filter::<PaymentStatus>(query.payment_status.as_deref())?,
        phone: query.phone,
        lot_id: query.lot_id,
    };
    let page = PageRequest::new(query.page, query.limit);

    let bookings = state
        .reporting
        .list_bookings(&filter, page)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(bookings))
}

/// GET /v1/bookings/:id
/// Retrieve one booking with its lot and payment history
async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingDetail>, AppError> {
    let detail = state
        .reporting
        .get_booking(booking_id)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(detail))
}

/// POST /v1/bookings/:id/slip
/// Attach a payment slip; moves the payment to SUBMITTED
async fn submit_slip(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<SubmitSlipRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .desk
        .submit_proof(booking_id, req.slip_url)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(booking))
}

/// POST /v1/bookings/:id/verify
/// Admin ruling on a submitted slip; replays answer ALREADY_FINALIZED
async fn verify_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerificationOutcome>, AppError> {
    let decision = VerifyDecision {
        approve: req.approve,
        method: req.method.unwrap_or(PaymentMethod::BankTransfer),
        bank_name: req.bank_name,
        account_name: req.account_name,
        reviewed_by: Some(claims.sub),
    };

    let outcome = state
        .desk
        .verify_payment(booking_id, decision)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(outcome))
}

/// POST /v1/bookings/:id/cancel
/// Cancel a booking and release its lot; idempotent on repeat
async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    body: Option<Json<CancelBookingRequest>>,
) -> Result<Json<Booking>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let booking = state
        .coordinator
        .cancel_booking(booking_id, req.reason)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(booking))
}

/// DELETE /v1/bookings/:id
/// Hard-delete a booking; its payment records are kept
async fn delete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .coordinator
        .delete_booking(booking_id)
        .await
        .map_err(AppError::from_engine)?;

    Ok(StatusCode::NO_CONTENT)
}
