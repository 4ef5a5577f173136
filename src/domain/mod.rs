//! Domain types for the capital and profit-split ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Primitives: ClientId, Stock, MonthKey
//! - Ledger records (Trade, CapitalMovement, Client) that validate on construction
//! - Split configuration snapshots

pub mod client;
pub mod decimal;
pub mod defect;
pub mod movement;
pub mod primitives;
pub mod split_config;
pub mod trade;

pub use client::Client;
pub use decimal::Decimal;
pub use defect::RecordDefect;
pub use movement::{sort_movements, CapitalMovement, MovementKind};
pub use primitives::{ClientId, MonthKey, MonthKeyParseError, Stock};
pub use split_config::{ConfigurationError, ProfitSplit, RawSplitConfig, SplitConfig, SplitConfigSet};
pub use trade::Trade;
