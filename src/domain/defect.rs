//! Reasons a single input record is rejected.

use thiserror::Error;

/// What is wrong with one record. Always reported together with the record's
/// position (see `ingest::StructuralError`), never as a whole-batch failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordDefect {
    #[error("missing value for {0}")]
    Missing(&'static str),
    #[error("{field} is not a valid date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("{field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: String },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: String },
    #[error("{field} is outside the supported range (magnitude at most 1e18)")]
    OutOfRange { field: &'static str },
    #[error("sell_date {sell} is before buy_date {buy}")]
    SellBeforeBuy { buy: String, sell: String },
    #[error("unreadable record: {0}")]
    Unreadable(String),
    #[error("unknown movement kind {0:?}, expected contribution or withdrawal")]
    UnknownMovementKind(String),
}
