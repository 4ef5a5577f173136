//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `trades.rs` - Trade ledger operations
//! - `accounts.rs` - Client, capital movement and split config operations
//!
//! Decimals are stored as canonical strings and dates as `YYYY-MM-DD`. A row
//! that does not decode is reported as [`StoreError::Corrupt`], never
//! defaulted.

mod accounts;
mod trades;

use crate::domain::{
    CapitalMovement, Client, ClientId, Decimal, SplitConfig, SplitConfigSet, Trade,
};
use crate::store::{LedgerSnapshot, LedgerStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::HashSet;
use tracing::debug;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, StoreError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str_canonical(&raw)
        .map_err(|e| StoreError::Corrupt(format!("{column} {raw:?}: {e}")))
}

fn date_column(row: &SqliteRow, column: &str) -> Result<NaiveDate, StoreError> {
    let raw: String = row.try_get(column)?;
    parse_stored_date(column, &raw)
}

fn optional_date_column(row: &SqliteRow, column: &str) -> Result<Option<NaiveDate>, StoreError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| parse_stored_date(column, &s)).transpose()
}

fn parse_stored_date(column: &str, raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("{column} {raw:?}: {e}")))
}

#[async_trait]
impl LedgerStore for Repository {
    async fn load_snapshot(&self) -> Result<LedgerSnapshot, StoreError> {
        // One read transaction so a concurrent upload is seen entirely or not at all.
        let mut tx = self.pool.begin().await?;
        let trades = trades::fetch_trades(&mut *tx).await?;
        let clients = accounts::fetch_clients(&mut *tx).await?;
        let movements = accounts::fetch_movements(&mut *tx).await?;
        let splits = accounts::fetch_split_configs(&mut *tx).await?;
        tx.commit().await?;

        debug!(
            trades = trades.len(),
            clients = clients.len(),
            movements = movements.len(),
            "Loaded ledger snapshot"
        );
        Ok(LedgerSnapshot {
            trades,
            clients,
            movements,
            splits,
        })
    }

    async fn trade_keys(&self) -> Result<HashSet<String>, StoreError> {
        self.query_trade_keys().await
    }

    async fn insert_trades(&self, trades: &[Trade]) -> Result<usize, StoreError> {
        self.insert_trades_batch(trades).await
    }

    async fn upsert_client(&self, client: &Client) -> Result<(), StoreError> {
        self.upsert_client_row(client).await
    }

    async fn get_client(&self, client_id: &ClientId) -> Result<Option<Client>, StoreError> {
        self.query_client(client_id).await
    }

    async fn insert_movement(&self, movement: &CapitalMovement) -> Result<bool, StoreError> {
        self.insert_movement_row(movement).await
    }

    async fn split_configs(&self) -> Result<SplitConfigSet, StoreError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_split_configs(&mut *conn).await
    }

    async fn save_split_config(
        &self,
        client_id: Option<&ClientId>,
        config: &SplitConfig,
    ) -> Result<(), StoreError> {
        self.upsert_split_config(client_id, config).await
    }

    async fn seed_global_split_config(&self, config: &SplitConfig) -> Result<bool, StoreError> {
        self.insert_global_split_config_if_absent(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{MovementKind, Stock};
    use tempfile::TempDir;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn setup() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("ledger.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (temp_dir, Repository::new(pool))
    }

    fn config() -> SplitConfig {
        SplitConfig::parse("0.25", "0.40").unwrap()
    }

    #[tokio::test]
    async fn snapshot_round_trips_the_whole_ledger() {
        let (_dir, repo) = setup().await;
        repo.seed_global_split_config(&config()).await.unwrap();

        let trade = Trade::new(
            None,
            Stock::new("MSFT"),
            date(2024, 3, 1),
            date(2024, 3, 15),
            d("400.125"),
            d("410"),
            d("3"),
        )
        .unwrap();
        assert_eq!(repo.insert_trades(&[trade.clone()]).await.unwrap(), 1);

        let client = Client::new(
            ClientId::new("alice"),
            "Alice",
            Some("alice@example.com".to_string()),
            d("10000"),
            Some(date(2024, 1, 1)),
        )
        .unwrap();
        repo.upsert_client(&client).await.unwrap();

        let movement = CapitalMovement::new(
            "m1",
            ClientId::new("alice"),
            date(2024, 2, 10),
            d("2500.50"),
            MovementKind::Withdrawal,
            Some("rebalance".to_string()),
        )
        .unwrap();
        assert!(repo.insert_movement(&movement).await.unwrap());

        let snapshot = repo.load_snapshot().await.unwrap();
        assert_eq!(snapshot.trades, vec![trade]);
        assert_eq!(snapshot.clients, vec![client]);
        assert_eq!(snapshot.movements, vec![movement]);
        assert_eq!(snapshot.splits.global, config());
    }

    #[tokio::test]
    async fn snapshot_without_global_config_fails() {
        let (_dir, repo) = setup().await;
        assert!(matches!(
            repo.load_snapshot().await,
            Err(StoreError::MissingGlobalConfig)
        ));
    }

    #[tokio::test]
    async fn corrupt_decimal_is_reported_not_defaulted() {
        let (_dir, repo) = setup().await;
        repo.seed_global_split_config(&config()).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO trades (trade_key, stock, buy_date, sell_date, buy_price, sell_price, quantity, created_at)
            VALUES ('id:bad', 'AAPL', '2024-01-02', '2024-01-05', 'abc', '10', '1', 0)
            "#,
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let err = repo.load_snapshot().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)), "got {err}");
    }
}
