use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use talad_booking::PaymentRecord;
use talad_core::repository::{PaymentFilter, PaymentRepository, StoreResult};
use talad_shared::{PageRequest, Paged};

use crate::{map_sqlx_err, parse_stored};

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount_satang: i64,
    method: String,
    transaction_id: String,
    outcome: String,
    bank_name: Option<String>,
    account_name: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self) -> StoreResult<PaymentRecord> {
        Ok(PaymentRecord {
            id: self.id,
            booking_id: self.booking_id,
            amount_satang: self.amount_satang,
            method: parse_stored(&self.method)?,
            transaction_id: self.transaction_id,
            outcome: parse_stored(&self.outcome)?,
            bank_name: self.bank_name,
            account_name: self.account_name,
            recorded_at: self.recorded_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, booking_id, amount_satang, method, transaction_id, outcome, bank_name, account_name, recorded_at";

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn append_payment(&self, record: &PaymentRecord) -> StoreResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO payments ({PAYMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#
        ))
        .bind(record.id)
        .bind(record.booking_id)
        .bind(record.amount_satang)
        .bind(record.method.as_str())
        .bind(&record.transaction_id)
        .bind(record.outcome.as_str())
        .bind(record.bank_name.as_deref())
        .bind(record.account_name.as_deref())
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PaymentRecord>> {
        let outcome = filter.outcome.map(|o| o.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payments
            WHERE ($1::uuid IS NULL OR booking_id = $1)
              AND ($2::text IS NULL OR outcome = $2)
            "#,
        )
        .bind(filter.booking_id)
        .bind(outcome)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE ($1::uuid IS NULL OR booking_id = $1)
              AND ($2::text IS NULL OR outcome = $2)
            ORDER BY recorded_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.booking_id)
        .bind(outcome)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let items = rows
            .into_iter()
            .map(PaymentRow::into_record)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Paged::new(items, total as u64, page))
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1 ORDER BY recorded_at DESC"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter().map(PaymentRow::into_record).collect()
    }
}
