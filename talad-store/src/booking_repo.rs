use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use talad_booking::{Booking, BookingStatus, PaymentStatus, Vendor};
use talad_core::repository::{
    BookingFilter, BookingRepository, BookingTallies, PaymentTallies, StoreResult,
};
use talad_shared::{PageRequest, Paged, Redacted};

use crate::{map_sqlx_err, parse_stored};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    lot_id: Uuid,
    vendor_name: String,
    vendor_phone: String,
    vendor_email: String,
    business_type: String,
    business_description: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    total_satang: i64,
    status: String,
    payment_status: String,
    slip_url: Option<String>,
    notes: Option<String>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> StoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            lot_id: self.lot_id,
            vendor: Vendor {
                name: self.vendor_name,
                phone: Redacted::new(self.vendor_phone),
                email: Redacted::new(self.vendor_email),
                business_type: self.business_type,
                business_description: self.business_description,
            },
            start_date: self.start_date,
            end_date: self.end_date,
            total_satang: self.total_satang,
            status: parse_stored(&self.status)?,
            payment_status: parse_stored(&self.payment_status)?,
            slip_url: self.slip_url,
            notes: self.notes,
            cancel_reason: self.cancel_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingTallyRow {
    total: i64,
    pending: i64,
    confirmed: i64,
    cancelled: i64,
}

#[derive(sqlx::FromRow)]
struct PaymentTallyRow {
    pending: i64,
    submitted: i64,
    verified: i64,
    failed: i64,
}

const BOOKING_COLUMNS: &str = "id, lot_id, vendor_name, vendor_phone, vendor_email, business_type, business_description, start_date, end_date, total_satang, status, payment_status, slip_url, notes, cancel_reason, created_at, updated_at";

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO bookings ({BOOKING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#
        ))
        .bind(booking.id)
        .bind(booking.lot_id)
        .bind(&booking.vendor.name)
        .bind(booking.vendor.phone.inner().as_str())
        .bind(booking.vendor.email.inner().as_str())
        .bind(&booking.vendor.business_type)
        .bind(booking.vendor.business_description.as_deref())
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.total_satang)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.slip_url.as_deref())
        .bind(booking.notes.as_deref())
        .bind(booking.cancel_reason.as_deref())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<Booking>> {
        let status = filter.status.map(|s| s.as_str());
        let payment = filter.payment_status.map(|s| s.as_str());
        let phone = filter.phone.as_deref();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR payment_status = $2)
              AND ($3::text IS NULL OR vendor_phone ILIKE '%' || $3 || '%')
              AND ($4::uuid IS NULL OR lot_id = $4)
            "#,
        )
        .bind(status)
        .bind(payment)
        .bind(phone)
        .bind(filter.lot_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR payment_status = $2)
              AND ($3::text IS NULL OR vendor_phone ILIKE '%' || $3 || '%')
              AND ($4::uuid IS NULL OR lot_id = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(status)
        .bind(payment)
        .bind(phone)
        .bind(filter.lot_id)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let items = rows
            .into_iter()
            .map(BookingRow::into_booking)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Paged::new(items, total as u64, page))
    }

    async fn update_booking_guarded(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_payment: Option<PaymentStatus>,
    ) -> StoreResult<bool> {
        // Compare-and-set on the state columns. The match count is the
        // verdict; a miss writes nothing.
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, payment_status = $3, slip_url = $4, cancel_reason = $5, updated_at = $6
            WHERE id = $1
              AND status = $7
              AND ($8::text IS NULL OR payment_status = $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.slip_url.as_deref())
        .bind(booking.cancel_reason.as_deref())
        .bind(booking.updated_at)
        .bind(expected_status.as_str())
        .bind(expected_payment.map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_booking(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn active_booking_for_lot(&self, lot_id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE lot_id = $1 AND status IN ('PENDING', 'CONFIRMED')
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(lot_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn booking_tallies(&self) -> StoreResult<BookingTallies> {
        let row = sqlx::query_as::<_, BookingTallyRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE status = 'CONFIRMED') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'CANCELLED') AS cancelled
            FROM bookings
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(BookingTallies {
            total: row.total,
            pending: row.pending,
            confirmed: row.confirmed,
            cancelled: row.cancelled,
        })
    }

    async fn payment_tallies(&self) -> StoreResult<PaymentTallies> {
        let row = sqlx::query_as::<_, PaymentTallyRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE payment_status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE payment_status = 'SUBMITTED') AS submitted,
                COUNT(*) FILTER (WHERE payment_status = 'VERIFIED') AS verified,
                COUNT(*) FILTER (WHERE payment_status = 'FAILED') AS failed
            FROM bookings
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(PaymentTallies {
            pending: row.pending,
            submitted: row.submitted,
            verified: row.verified,
            failed: row.failed,
        })
    }

    async fn verified_revenue(&self) -> StoreResult<i64> {
        let revenue: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_satang), 0)::BIGINT FROM bookings
            WHERE status = 'CONFIRMED' AND payment_status = 'VERIFIED'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(revenue)
    }

    async fn recent_bookings(&self, limit: u32) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn search_vendors(&self, query: &str, limit: u32) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE vendor_name ILIKE '%' || $1 || '%'
               OR vendor_email ILIKE '%' || $1 || '%'
               OR vendor_phone ILIKE '%' || $1 || '%'
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(query)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }
}
