//! Trade ledger operations for the repository.

use crate::domain::{Stock, Trade};
use crate::store::StoreError;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use std::collections::HashSet;

use super::{date_column, decimal_column, Repository};

impl Repository {
    /// Insert trades in a single transaction, skipping keys already stored.
    ///
    /// Returns the number of newly inserted trades (excludes duplicates).
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_trades_batch(&self, trades: &[Trade]) -> Result<usize, StoreError> {
        if trades.is_empty() {
            return Ok(0);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut total_inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for trade in trades {
            let result = sqlx::query(
                r#"
                INSERT INTO trades (
                    trade_key, stock, buy_date, sell_date,
                    buy_price, sell_price, quantity, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(trade_key) DO NOTHING
                "#,
            )
            .bind(trade.trade_key())
            .bind(trade.stock().as_str())
            .bind(trade.buy_date().to_string())
            .bind(trade.sell_date().to_string())
            .bind(trade.buy_price().to_canonical_string())
            .bind(trade.sell_price().to_canonical_string())
            .bind(trade.quantity().to_canonical_string())
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    /// Keys of every stored trade.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_trade_keys(&self) -> Result<HashSet<String>, StoreError> {
        let rows = sqlx::query("SELECT trade_key FROM trades")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("trade_key").map_err(StoreError::from))
            .collect()
    }
}

/// All trades, ordered by (sell_date, trade_key).
pub(super) async fn fetch_trades(conn: &mut SqliteConnection) -> Result<Vec<Trade>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT trade_key, stock, buy_date, sell_date, buy_price, sell_price, quantity
        FROM trades
        ORDER BY sell_date ASC, trade_key ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let trade_key: String = row.try_get("trade_key")?;
            let trade = Trade::new(
                None,
                Stock::new(row.try_get::<String, _>("stock")?),
                date_column(row, "buy_date")?,
                date_column(row, "sell_date")?,
                decimal_column(row, "buy_price")?,
                decimal_column(row, "sell_price")?,
                decimal_column(row, "quantity")?,
            )
            .map_err(|e| StoreError::Corrupt(format!("trade {trade_key}: {e}")))?;
            Ok(trade.with_trade_key(trade_key))
        })
        .collect()
}
