use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use talad_booking::{PaymentOutcome, PaymentRecord};
use talad_core::repository::PaymentFilter;
use talad_shared::{PageRequest, Paged};

use crate::error::{parse_query_filter, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub booking_id: Option<Uuid>,
    pub outcome: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/payments", get(list_payments))
}

/// GET /v1/payments
/// List payment records, newest first
async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Paged<PaymentRecord>>, AppError> {
    let filter = PaymentFilter {
        booking_id: query.booking_id,
        outcome: parse_query_filter::<PaymentOutcome>(query.outcome.as_deref())?,
    };
    let page = PageRequest::new(query.page, query.limit);

    let payments = state
        .reporting
        .list_payments(&filter, page)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(payments))
}
