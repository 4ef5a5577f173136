//! Ledger ingestion: turning raw tabular records into validated domain records.
//!
//! Every record is validated on its own. A bad record becomes a
//! [`StructuralError`] naming its row, and the rest of the batch continues.

use crate::domain::{Decimal, RecordDefect};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

pub mod clients;
pub mod movements;
pub mod trades;

pub use clients::ClientRecord;
pub use movements::{ingest_movements, MovementRecord};
pub use trades::{ingest_trade_log, ingest_trades, TradeBatch, TradeRecord};

/// Position (and, when known, identity) of a record within its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    /// 1-based data row number (the header row is not counted).
    pub index: usize,
    pub identity: Option<String>,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Some(identity) => write!(f, "row {} ({})", self.index, identity),
            None => write!(f, "row {}", self.index),
        }
    }
}

/// A single rejected record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{record}: {defect}")]
pub struct StructuralError {
    pub record: RecordRef,
    pub defect: RecordDefect,
}

/// The file as a whole is not a trade log.
#[derive(Debug, Error)]
pub enum LogFormatError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("csv error: {0}")]
    Csv(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestOptions {
    /// Drop trades bought and sold on the same date.
    pub drop_same_day_trades: bool,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar date in one of the accepted layouts.
///
/// Timestamps keep only their date part.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, RecordDefect> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordDefect::Missing(field));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                chrono::NaiveDateTime::parse_from_str(trimmed, fmt)
                    .ok()
                    .map(|dt| dt.date())
            })
        })
        .ok_or_else(|| RecordDefect::InvalidDate {
            field,
            value: trimmed.to_string(),
        })
}

pub(crate) fn require<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, RecordDefect> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(RecordDefect::Missing(field))
}

pub(crate) fn parse_decimal(field: &'static str, value: Option<&str>) -> Result<Decimal, RecordDefect> {
    let raw = require(field, value)?;
    Decimal::from_str_canonical(raw).map_err(|_| RecordDefect::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}
