use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use talad_catalog::Lot;
use talad_catalog::LotStatus;
use talad_core::repository::{LotFilter, LotRepository, LotTallies, StoreResult};
use talad_shared::{PageRequest, Paged};

use crate::{map_sqlx_err, parse_stored};

pub struct PgLotRepository {
    pool: PgPool,
}

impl PgLotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct LotRow {
    id: Uuid,
    lot_number: String,
    section: String,
    zone_type: String,
    location: String,
    size: String,
    price_satang: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LotRow {
    fn into_lot(self) -> StoreResult<Lot> {
        Ok(Lot {
            id: self.id,
            lot_number: self.lot_number,
            section: parse_stored(&self.section)?,
            zone_type: parse_stored(&self.zone_type)?,
            location: self.location,
            size: self.size,
            price_satang: self.price_satang,
            status: parse_stored(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LotTallyRow {
    total: i64,
    available: i64,
    reserved: i64,
    maintenance: i64,
}

const LOT_COLUMNS: &str =
    "id, lot_number, section, zone_type, location, size, price_satang, status, created_at, updated_at";

#[async_trait]
impl LotRepository for PgLotRepository {
    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lots (id, lot_number, section, zone_type, location, size, price_satang, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(lot.id)
        .bind(&lot.lot_number)
        .bind(lot.section.as_str())
        .bind(lot.zone_type.as_str())
        .bind(&lot.location)
        .bind(&lot.size)
        .bind(lot.price_satang)
        .bind(lot.status.as_str())
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn get_lot(&self, id: Uuid) -> StoreResult<Option<Lot>> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(LotRow::into_lot).transpose()
    }

    async fn get_lot_by_number(&self, lot_number: &str) -> StoreResult<Option<Lot>> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE lot_number = $1"
        ))
        .bind(lot_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(LotRow::into_lot).transpose()
    }

    async fn list_lots(&self, filter: &LotFilter, page: PageRequest) -> StoreResult<Paged<Lot>> {
        let status = filter.status.map(|s| s.as_str());
        let section = filter.section.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lots
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR section = $2)
            "#,
        )
        .bind(status)
        .bind(section)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            SELECT {LOT_COLUMNS} FROM lots
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR section = $2)
            ORDER BY lot_number
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(status)
        .bind(section)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let items = rows
            .into_iter()
            .map(LotRow::into_lot)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Paged::new(items, total as u64, page))
    }

    async fn update_lot(&self, lot: &Lot) -> StoreResult<bool> {
        // Descriptive fields only. Status moves exclusively through
        // update_lot_status_if.
        let result = sqlx::query(
            r#"
            UPDATE lots
            SET location = $2, size = $3, price_satang = $4, zone_type = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(lot.id)
        .bind(&lot.location)
        .bind(&lot.size)
        .bind(lot.price_satang)
        .bind(lot.zone_type.as_str())
        .bind(lot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_lot(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM lots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_lot_status_if(
        &self,
        id: Uuid,
        expected: LotStatus,
        next: LotStatus,
    ) -> StoreResult<bool> {
        // The WHERE clause is the whole concurrency story: the row only
        // changes when it is still in the expected state, and the match
        // count tells us whether we won.
        let result = sqlx::query(
            "UPDATE lots SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn replace_all_lots(&self, lots: &[Lot]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query("DELETE FROM lots")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        for lot in lots {
            sqlx::query(
                r#"
                INSERT INTO lots (id, lot_number, section, zone_type, location, size, price_satang, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(lot.id)
            .bind(&lot.lot_number)
            .bind(lot.section.as_str())
            .bind(lot.zone_type.as_str())
            .bind(&lot.location)
            .bind(&lot.size)
            .bind(lot.price_satang)
            .bind(lot.status.as_str())
            .bind(lot.created_at)
            .bind(lot.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn lot_tallies(&self) -> StoreResult<LotTallies> {
        let row = sqlx::query_as::<_, LotTallyRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'AVAILABLE') AS available,
                COUNT(*) FILTER (WHERE status = 'RESERVED') AS reserved,
                COUNT(*) FILTER (WHERE status = 'MAINTENANCE') AS maintenance
            FROM lots
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(LotTallies {
            total: row.total,
            available: row.available,
            reserved: row.reserved,
            maintenance: row.maintenance,
        })
    }
}
