//! Trade-log ingestion.

use super::{parse_date, parse_decimal, require, IngestOptions, LogFormatError, RecordRef, StructuralError};
use crate::domain::{RecordDefect, Stock, Trade};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One unvalidated row of a trade log, as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeRecord {
    pub trade_id: Option<String>,
    pub stock: Option<String>,
    pub buy_date: Option<String>,
    pub sell_date: Option<String>,
    pub buy_price: Option<String>,
    pub sell_price: Option<String>,
    pub quantity: Option<String>,
}

impl TradeRecord {
    pub fn validate(&self) -> Result<Trade, RecordDefect> {
        let stock = require("stock", self.stock.as_deref())?;
        let buy_date = parse_date("buy_date", require("buy_date", self.buy_date.as_deref())?)?;
        let sell_date = parse_date("sell_date", require("sell_date", self.sell_date.as_deref())?)?;
        let buy_price = parse_decimal("buy_price", self.buy_price.as_deref())?;
        let sell_price = parse_decimal("sell_price", self.sell_price.as_deref())?;
        let quantity = parse_decimal("quantity", self.quantity.as_deref())?;

        Trade::new(
            self.trade_id.as_deref(),
            Stock::new(stock),
            buy_date,
            sell_date,
            buy_price,
            sell_price,
            quantity,
        )
    }

    fn identity(&self) -> Option<String> {
        self.trade_id
            .as_deref()
            .or(self.stock.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Outcome of ingesting one batch of trade records.
#[derive(Debug, Clone, Default)]
pub struct TradeBatch {
    /// Valid, previously unseen trades in input order.
    pub accepted: Vec<Trade>,
    pub rejected: Vec<StructuralError>,
    /// Trades skipped because their key is already in the ledger or earlier in the batch.
    pub duplicates: usize,
    /// Trades skipped because `drop_same_day_trades` is set.
    pub same_day_dropped: usize,
}

/// Validate `records` one by one.
///
/// `existing_keys` holds the trade keys already in the ledger.
pub fn ingest_trades<I>(records: I, existing_keys: &HashSet<String>, options: IngestOptions) -> TradeBatch
where
    I: IntoIterator<Item = Result<TradeRecord, RecordDefect>>,
{
    let mut batch = TradeBatch::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (i, record) in records.into_iter().enumerate() {
        let index = i + 1;
        let (identity, validated) = match record {
            Ok(record) => (record.identity(), record.validate()),
            Err(defect) => (None, Err(defect)),
        };

        let trade = match validated {
            Ok(trade) => trade,
            Err(defect) => {
                warn!(row = index, error = %defect, "Rejected trade record");
                batch.rejected.push(StructuralError {
                    record: RecordRef { index, identity },
                    defect,
                });
                continue;
            }
        };

        if options.drop_same_day_trades && trade.is_same_day() {
            batch.same_day_dropped += 1;
            continue;
        }

        if existing_keys.contains(trade.trade_key()) || !seen.insert(trade.trade_key().to_string())
        {
            debug!(row = index, trade_key = trade.trade_key(), "Skipping duplicate trade");
            batch.duplicates += 1;
            continue;
        }

        batch.accepted.push(trade);
    }

    info!(
        accepted = batch.accepted.len(),
        rejected = batch.rejected.len(),
        duplicates = batch.duplicates,
        same_day_dropped = batch.same_day_dropped,
        "Trade batch ingested"
    );
    batch
}

/// Parse a CSV trade log and ingest its rows.
///
/// Header names are matched loosely: case, spaces and punctuation are ignored,
/// so `Buy Date`, `buy_date` and `BUYDATE` are the same column.
pub fn ingest_trade_log(
    csv_bytes: &[u8],
    existing_keys: &HashSet<String>,
    options: IngestOptions,
) -> Result<TradeBatch, LogFormatError> {
    let records = parse_trade_log(csv_bytes)?;
    Ok(ingest_trades(records, existing_keys, options))
}

#[derive(Debug, Default)]
struct ColumnMap {
    trade_id: Option<usize>,
    stock: Option<usize>,
    buy_date: Option<usize>,
    sell_date: Option<usize>,
    buy_price: Option<usize>,
    sell_price: Option<usize>,
    quantity: Option<usize>,
}

fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LogFormatError> {
        let mut map = ColumnMap::default();
        for (i, name) in headers.iter().enumerate() {
            let slot = match normalize_header(name).as_str() {
                "tradeid" => &mut map.trade_id,
                "stock" | "symbol" | "ticker" => &mut map.stock,
                "buydate" => &mut map.buy_date,
                "selldate" => &mut map.sell_date,
                "buyprice" => &mut map.buy_price,
                "sellprice" => &mut map.sell_price,
                "quantity" | "qty" | "shares" => &mut map.quantity,
                _ => continue,
            };
            slot.get_or_insert(i);
        }

        let missing: Vec<&'static str> = [
            ("buy_date", map.buy_date),
            ("sell_date", map.sell_date),
            ("stock", map.stock),
            ("buy_price", map.buy_price),
            ("sell_price", map.sell_price),
            ("quantity", map.quantity),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(map)
        } else {
            Err(LogFormatError::MissingColumns(missing))
        }
    }

    fn record(&self, row: &csv::StringRecord) -> TradeRecord {
        let get = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);
        TradeRecord {
            trade_id: get(self.trade_id),
            stock: get(self.stock),
            buy_date: get(self.buy_date),
            sell_date: get(self.sell_date),
            buy_price: get(self.buy_price),
            sell_price: get(self.sell_price),
            quantity: get(self.quantity),
        }
    }
}

fn parse_trade_log(
    csv_bytes: &[u8],
) -> Result<Vec<Result<TradeRecord, RecordDefect>>, LogFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_bytes);

    let headers = reader
        .headers()
        .map_err(|e| LogFormatError::Csv(e.to_string()))?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    Ok(reader
        .records()
        .map(|row| {
            row.map(|r| columns.record(&r))
                .map_err(|e| RecordDefect::Unreadable(e.to_string()))
        })
        .collect())
}
