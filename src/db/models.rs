//! Row types for the tables in `migrations/`, and their conversions to domain types.
//! Decimals are stored as TEXT to keep cents exact; timestamps as unix nanoseconds.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{AppError, Result};
use crate::types::{
    Condition, FingerprintKey, FirearmType, HistoricalPoint, InventoryRecord, RecordStatus, ValueEstimate, ValueSource,
};

#[derive(Debug, sqlx::FromRow)]
pub struct InventoryRow {
    pub fingerprint: String,
    pub manufacturer: String,
    pub model: String,
    pub caliber: String,
    pub raw_manufacturer: String,
    pub raw_model: String,
    pub raw_caliber: String,
    pub condition: String,
    pub firearm_type: String,
    pub listing_price: String,
    pub listing_url: String,
    pub description: Option<String>,
    pub estimate: String,
    pub estimate_low: String,
    pub estimate_high: String,
    pub estimate_width: String,
    pub value_source: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub status: String,
    pub observation_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct HistoryRow {
    pub fingerprint: String,
    pub recorded_at: i64,
    pub price: String,
    pub estimated_value: String,
}

pub fn to_nanos(ts: DateTime<Utc>) -> Result<i64> {
    ts.timestamp_nanos_opt()
        .ok_or_else(|| AppError::Decode(format!("timestamp out of range: {ts}")))
}

fn from_nanos(ns: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(ns)
}

fn decimal(column: &str, s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| AppError::Decode(format!("{column}={s:?}: {e}")))
}

impl TryFrom<InventoryRow> for InventoryRecord {
    type Error = AppError;

    fn try_from(row: InventoryRow) -> Result<Self> {
        let source = ValueSource::parse(&row.value_source)
            .ok_or_else(|| AppError::Decode(format!("value_source={:?}", row.value_source)))?;
        let status = RecordStatus::parse(&row.status)
            .ok_or_else(|| AppError::Decode(format!("status={:?}", row.status)))?;
        Ok(InventoryRecord {
            fingerprint: row.fingerprint.parse::<FingerprintKey>()?,
            manufacturer: row.raw_manufacturer,
            model: row.raw_model,
            caliber: row.raw_caliber,
            condition: Condition::parse(&row.condition),
            firearm_type: FirearmType::parse(&row.firearm_type),
            listing_price: decimal("listing_price", &row.listing_price)?,
            listing_url: row.listing_url,
            description: row.description,
            estimate: ValueEstimate {
                estimate: decimal("estimate", &row.estimate)?,
                low: decimal("estimate_low", &row.estimate_low)?,
                high: decimal("estimate_high", &row.estimate_high)?,
                width: decimal("estimate_width", &row.estimate_width)?,
                source,
                confidence: source.confidence(),
            },
            first_seen: from_nanos(row.first_seen),
            last_seen: from_nanos(row.last_seen),
            status,
            observation_count: u32::try_from(row.observation_count)
                .map_err(|_| AppError::Decode(format!("observation_count={}", row.observation_count)))?,
        })
    }
}

impl TryFrom<HistoryRow> for HistoricalPoint {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(HistoricalPoint {
            fingerprint: row.fingerprint.parse()?,
            timestamp: from_nanos(row.recorded_at),
            price: decimal("price", &row.price)?,
            estimated_value: decimal("estimated_value", &row.estimated_value)?,
        })
    }
}
