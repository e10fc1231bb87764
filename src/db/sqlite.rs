use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::fingerprint::model_line;
use crate::types::{FingerprintKey, HistoricalPoint, InventoryRecord};

use super::models::{to_nanos, HistoryRow, InventoryRow};
use super::{HistoryQuery, Storage};

const UPSERT_RECORD: &str = r#"
    INSERT INTO inventory (
        fingerprint, manufacturer, model, caliber,
        raw_manufacturer, raw_model, raw_caliber,
        condition, firearm_type, listing_price, listing_url, description,
        estimate, estimate_low, estimate_high, estimate_width, value_source,
        first_seen, last_seen, status, observation_count
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(fingerprint) DO UPDATE SET
        raw_manufacturer  = excluded.raw_manufacturer,
        raw_model         = excluded.raw_model,
        raw_caliber       = excluded.raw_caliber,
        condition         = excluded.condition,
        firearm_type      = excluded.firearm_type,
        listing_price     = excluded.listing_price,
        listing_url       = excluded.listing_url,
        description       = excluded.description,
        estimate          = excluded.estimate,
        estimate_low      = excluded.estimate_low,
        estimate_high     = excluded.estimate_high,
        estimate_width    = excluded.estimate_width,
        value_source      = excluded.value_source,
        first_seen        = excluded.first_seen,
        last_seen         = excluded.last_seen,
        status            = excluded.status,
        observation_count = excluded.observation_count
"#;

const INSERT_POINT: &str = r#"
    INSERT INTO price_history (fingerprint, manufacturer, model, recorded_at, price, estimated_value)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

/// SQLite-backed storage. Each write method runs in its own transaction.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) and migrate. `sqlite::memory:` needs `max_connections = 1`,
    /// since every connection gets its own in-memory database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn load_records(&self, only_active: bool) -> Result<HashMap<FingerprintKey, InventoryRecord>> {
        let sql = if only_active {
            "SELECT * FROM inventory WHERE status = 'ACTIVE'"
        } else {
            "SELECT * FROM inventory"
        };
        let rows = sqlx::query_as::<_, InventoryRow>(sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| InventoryRecord::try_from(row).map(|r| (r.fingerprint.clone(), r)))
            .collect()
    }
}

async fn upsert_record(conn: &mut SqliteConnection, r: &InventoryRecord) -> Result<()> {
    sqlx::query(UPSERT_RECORD)
        .bind(r.fingerprint.to_string())
        .bind(r.fingerprint.manufacturer())
        .bind(r.fingerprint.model())
        .bind(r.fingerprint.caliber())
        .bind(&r.manufacturer)
        .bind(&r.model)
        .bind(&r.caliber)
        .bind(r.condition.to_string())
        .bind(r.firearm_type.to_string())
        .bind(r.listing_price.to_string())
        .bind(&r.listing_url)
        .bind(r.description.as_deref())
        .bind(r.estimate.estimate.to_string())
        .bind(r.estimate.low.to_string())
        .bind(r.estimate.high.to_string())
        .bind(r.estimate.width.to_string())
        .bind(r.estimate.source.to_string())
        .bind(to_nanos(r.first_seen)?)
        .bind(to_nanos(r.last_seen)?)
        .bind(r.status.to_string())
        .bind(i64::from(r.observation_count))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_point(conn: &mut SqliteConnection, p: &HistoricalPoint) -> Result<()> {
    sqlx::query(INSERT_POINT)
        .bind(p.fingerprint.to_string())
        .bind(p.fingerprint.manufacturer())
        .bind(p.fingerprint.model())
        .bind(to_nanos(p.timestamp)?)
        .bind(p.price.to_string())
        .bind(p.estimated_value.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn load_active_records(&self) -> Result<HashMap<FingerprintKey, InventoryRecord>> {
        self.load_records(true).await
    }

    async fn load_all_records(&self) -> Result<HashMap<FingerprintKey, InventoryRecord>> {
        self.load_records(false).await
    }

    async fn save(&self, records: &[InventoryRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            upsert_record(&mut *tx, r).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append_history(&self, points: &[HistoricalPoint]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for p in points {
            insert_point(&mut *tx, p).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Records first (history rows reference them), then points, in one transaction.
    /// A failure anywhere rolls back the whole pass when `tx` drops.
    async fn commit_pass(&self, records: &[InventoryRecord], points: &[HistoricalPoint]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for r in records {
            upsert_record(&mut *tx, r).await?;
        }
        for p in points {
            insert_point(&mut *tx, p).await?;
        }
        tx.commit().await?;
        debug!(records = records.len(), points = points.len(), "pass committed");
        Ok(())
    }

    async fn load_history(&self, query: &HistoryQuery) -> Result<Vec<HistoricalPoint>> {
        let rows = match query {
            HistoryQuery::Fingerprint(fp) => {
                sqlx::query_as::<_, HistoryRow>(
                    "SELECT fingerprint, recorded_at, price, estimated_value FROM price_history
                     WHERE fingerprint = ? ORDER BY recorded_at, id",
                )
                .bind(fp.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            HistoryQuery::Model { manufacturer, model } => {
                let (manufacturer, model) = model_line(manufacturer, model);
                sqlx::query_as::<_, HistoryRow>(
                    "SELECT fingerprint, recorded_at, price, estimated_value FROM price_history
                     WHERE manufacturer = ? AND model = ? ORDER BY recorded_at, fingerprint, id",
                )
                .bind(manufacturer)
                .bind(model)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(HistoricalPoint::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::resolver::{resolve, PassOutcome, ValuedListing};
    use crate::types::{Condition, RawListing};

    fn glock19(price: i64) -> ValuedListing {
        ValuedListing::from_raw(RawListing {
            manufacturer: "Glock".to_string(),
            model: "19".to_string(),
            caliber: "9mm".to_string(),
            condition: Condition::UsedGood,
            price: Decimal::from(price),
            url: "/used/glock-19".to_string(),
            scraped_at: Utc.with_ymd_and_hms(2024, 9, 1, 6, 0, 0).unwrap(),
            section: None,
            description: None,
        })
    }

    /// References no inventory row, so its insert violates the history foreign key.
    fn orphan_point() -> HistoricalPoint {
        HistoricalPoint {
            fingerprint: FingerprintKey::new("NOBODY", "NOTHING", "9MM"),
            timestamp: Utc.with_ymd_and_hms(2024, 9, 1, 6, 0, 0).unwrap(),
            price: Decimal::from(1),
            estimated_value: Decimal::from(1),
        }
    }

    async fn storage() -> SqliteStorage {
        SqliteStorage::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn glock_history() -> HistoryQuery {
        HistoryQuery::Fingerprint(FingerprintKey::new("GLOCK", "19", "9MM"))
    }

    #[tokio::test]
    async fn failed_point_insert_rolls_back_new_records() {
        let db = storage().await;
        let PassOutcome { records_to_save, mut history, .. } = resolve(vec![glock19(450)], &HashMap::new());
        history.push(orphan_point());

        assert!(db.commit_pass(&records_to_save, &history).await.is_err());
        assert!(db.load_all_records().await.unwrap().is_empty());
        assert!(db.load_history(&glock_history()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_point_insert_keeps_previous_pass_intact() {
        let db = storage().await;
        let first = resolve(vec![glock19(450)], &HashMap::new());
        db.commit_pass(&first.records_to_save, &first.history).await.unwrap();

        let stored = db.load_all_records().await.unwrap();
        let PassOutcome { records_to_save, mut history, .. } = resolve(vec![glock19(400)], &stored);
        assert_eq!(history.len(), 1);
        history.push(orphan_point());

        assert!(db.commit_pass(&records_to_save, &history).await.is_err());
        let after = db.load_all_records().await.unwrap();
        assert_eq!(after, stored);
        let prices: Vec<Decimal> = db
            .load_history(&glock_history())
            .await
            .unwrap()
            .iter()
            .map(|p| p.price)
            .collect();
        assert_eq!(prices, vec![Decimal::from(450)]);
    }
}
