//! Closed trade (a buy/sell pair) as held in the trade ledger.

use crate::domain::{Decimal, MonthKey, RecordDefect, Stock};
use chrono::NaiveDate;

/// A closed trade. Immutable once constructed; [`Trade::new`] is the only way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    trade_key: String,
    stock: Stock,
    buy_date: NaiveDate,
    sell_date: NaiveDate,
    buy_price: Decimal,
    sell_price: Decimal,
    quantity: Decimal,
    pnl: Decimal,
    position_size: Decimal,
    return_pct: Decimal,
}

impl Trade {
    /// Validate and build a trade.
    ///
    /// `trade_id`, when supplied by the log, becomes the trade key; otherwise
    /// the key is a hash of the trade's fields.
    pub fn new(
        trade_id: Option<&str>,
        stock: Stock,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
        buy_price: Decimal,
        sell_price: Decimal,
        quantity: Decimal,
    ) -> Result<Self, RecordDefect> {
        if stock.as_str().trim().is_empty() {
            return Err(RecordDefect::Missing("stock"));
        }
        if sell_date < buy_date {
            return Err(RecordDefect::SellBeforeBuy {
                buy: buy_date.to_string(),
                sell: sell_date.to_string(),
            });
        }
        for (field, value) in [
            ("buy_price", buy_price),
            ("sell_price", sell_price),
            ("quantity", quantity),
        ] {
            if !value.is_positive() {
                return Err(RecordDefect::NotPositive {
                    field,
                    value: value.to_canonical_string(),
                });
            }
        }

        let in_range = |field: &'static str, value: Option<Decimal>| {
            value
                .filter(Decimal::within_record_limit)
                .ok_or(RecordDefect::OutOfRange { field })
        };
        let spread = sell_price.checked_sub(buy_price);
        let position_size = in_range("position_size", buy_price.checked_mul(quantity))?;
        let pnl = in_range("pnl", spread.and_then(|s| s.checked_mul(quantity)))?;
        let return_pct = in_range("return_pct", spread.and_then(|s| s.percent_of(buy_price)))?;

        let stock = Stock::new(stock.as_str().trim());
        let trade_key = Self::compute_trade_key(
            trade_id, &stock, buy_date, sell_date, &buy_price, &sell_price, &quantity,
        );

        Ok(Trade {
            trade_key,
            stock,
            buy_date,
            sell_date,
            buy_price,
            sell_price,
            quantity,
            pnl,
            position_size,
            return_pct,
        })
    }

    /// Stable identity used for duplicate detection.
    ///
    /// Priority: explicit trade id > hash of the canonical trade fields.
    pub fn compute_trade_key(
        trade_id: Option<&str>,
        stock: &Stock,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
        buy_price: &Decimal,
        sell_price: &Decimal,
        quantity: &Decimal,
    ) -> String {
        if let Some(id) = trade_id.map(str::trim).filter(|s| !s.is_empty()) {
            return format!("id:{}", id);
        }

        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, stock.as_str());
        hash_var(&mut hasher, &buy_date.to_string());
        hash_var(&mut hasher, &sell_date.to_string());
        hash_var(&mut hasher, &buy_price.to_canonical_string());
        hash_var(&mut hasher, &sell_price.to_canonical_string());
        hash_var(&mut hasher, &quantity.to_canonical_string());

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    /// Reattach a key that was computed when the trade was first ingested.
    pub(crate) fn with_trade_key(mut self, trade_key: String) -> Self {
        self.trade_key = trade_key;
        self
    }

    pub fn trade_key(&self) -> &str {
        &self.trade_key
    }

    pub fn stock(&self) -> &Stock {
        &self.stock
    }

    pub fn buy_date(&self) -> NaiveDate {
        self.buy_date
    }

    pub fn sell_date(&self) -> NaiveDate {
        self.sell_date
    }

    pub fn buy_price(&self) -> Decimal {
        self.buy_price
    }

    pub fn sell_price(&self) -> Decimal {
        self.sell_price
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// `(sell_price - buy_price) * quantity`
    pub fn pnl(&self) -> Decimal {
        self.pnl
    }

    /// `buy_price * quantity`
    pub fn position_size(&self) -> Decimal {
        self.position_size
    }

    /// Per-trade return relative to the entry price, in percent.
    pub fn return_pct(&self) -> Decimal {
        self.return_pct
    }

    /// Flat trades count as losses.
    pub fn is_win(&self) -> bool {
        self.pnl().is_positive()
    }

    pub fn is_same_day(&self) -> bool {
        self.buy_date == self.sell_date
    }

    /// The month the trade's P&L is realized in.
    pub fn realization_month(&self) -> MonthKey {
        MonthKey::of(self.sell_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn aapl(buy: &str, sell: &str, qty: &str) -> Result<Trade, RecordDefect> {
        Trade::new(
            None,
            Stock::new("AAPL"),
            date(2024, 1, 3),
            date(2024, 1, 20),
            d(buy),
            d(sell),
            d(qty),
        )
    }

    #[test]
    fn derives_pnl_and_position_size() {
        let trade = aapl("150", "155", "100").unwrap();
        assert_eq!(trade.pnl(), d("500"));
        assert_eq!(trade.position_size(), d("15000"));
        assert!(trade.is_win());
        assert_eq!(trade.realization_month().to_string(), "2024-01");
    }

    #[test]
    fn flat_trade_is_not_a_win() {
        let trade = aapl("150", "150", "10").unwrap();
        assert!(trade.pnl().is_zero());
        assert!(!trade.is_win());
    }

    #[test]
    fn rejects_non_positive_values() {
        assert!(matches!(
            aapl("0", "155", "100"),
            Err(RecordDefect::NotPositive { field: "buy_price", .. })
        ));
        assert!(matches!(
            aapl("150", "155", "-1"),
            Err(RecordDefect::NotPositive { field: "quantity", .. })
        ));
    }

    #[test]
    fn rejects_derived_values_beyond_record_limit() {
        assert_eq!(
            aapl("1e20", "2e20", "1e10"),
            Err(RecordDefect::OutOfRange { field: "position_size" })
        );
        assert_eq!(
            aapl("1e-20", "5", "1"),
            Err(RecordDefect::OutOfRange { field: "return_pct" })
        );
        assert!(aapl("1000000", "1000001", "1000").is_ok());
    }

    #[test]
    fn rejects_sell_before_buy() {
        let result = Trade::new(
            None,
            Stock::new("MSFT"),
            date(2024, 2, 1),
            date(2024, 1, 31),
            d("10"),
            d("11"),
            d("1"),
        );
        assert!(matches!(result, Err(RecordDefect::SellBeforeBuy { .. })));
    }

    #[test]
    fn rejects_blank_stock() {
        let result = Trade::new(
            None,
            Stock::new("  "),
            date(2024, 1, 1),
            date(2024, 1, 2),
            d("10"),
            d("11"),
            d("1"),
        );
        assert_eq!(result, Err(RecordDefect::Missing("stock")));
    }

    #[test]
    fn trade_key_prefers_explicit_id() {
        let trade = Trade::new(
            Some(" T-0001 "),
            Stock::new("AAPL"),
            date(2024, 1, 3),
            date(2024, 1, 20),
            d("150"),
            d("155"),
            d("100"),
        )
        .unwrap();
        assert_eq!(trade.trade_key(), "id:T-0001");
    }

    #[test]
    fn trade_key_hash_ignores_decimal_formatting() {
        let a = aapl("150.00", "155", "100").unwrap();
        let b = aapl("150", "155.0", "100").unwrap();
        assert_eq!(a.trade_key(), b.trade_key());
        assert!(a.trade_key().starts_with("hash:"));
        assert_eq!(a.trade_key().len(), 5 + 32);
    }
}
