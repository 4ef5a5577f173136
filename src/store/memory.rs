//! In-memory ledger store for tests and embedding without a database.

use super::{LedgerSnapshot, LedgerStore, StoreError};
use crate::domain::{CapitalMovement, Client, ClientId, SplitConfig, SplitConfigSet, Trade};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Ledger {
    trades: Vec<Trade>,
    clients: BTreeMap<ClientId, Client>,
    movements: Vec<CapitalMovement>,
    global: Option<SplitConfig>,
    overrides: BTreeMap<ClientId, SplitConfig>,
}

/// Ledger kept behind a single lock, so every snapshot is consistent.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: RwLock<Ledger>,
}

impl MemoryStore {
    /// An empty store with no global split config yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_config(mut self, config: SplitConfig) -> Self {
        self.ledger.get_mut().global = Some(config);
        self
    }

    pub fn with_override(mut self, client_id: ClientId, config: SplitConfig) -> Self {
        self.ledger.get_mut().overrides.insert(client_id, config);
        self
    }

    /// Add trades; keys already present are skipped.
    pub fn with_trades(mut self, trades: Vec<Trade>) -> Self {
        let ledger = self.ledger.get_mut();
        for trade in trades {
            if !ledger.trades.iter().any(|t| t.trade_key() == trade.trade_key()) {
                ledger.trades.push(trade);
            }
        }
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.ledger
            .get_mut()
            .clients
            .insert(client.client_id().clone(), client);
        self
    }

    pub fn with_movement(mut self, movement: CapitalMovement) -> Self {
        self.ledger.get_mut().movements.push(movement);
        self
    }

    pub fn with_movements(mut self, movements: Vec<CapitalMovement>) -> Self {
        self.ledger.get_mut().movements.extend(movements);
        self
    }
}

impl Ledger {
    fn split_configs(&self) -> Result<SplitConfigSet, StoreError> {
        let global = self.global.ok_or(StoreError::MissingGlobalConfig)?;
        Ok(SplitConfigSet {
            global,
            clients: self.overrides.clone(),
        })
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load_snapshot(&self) -> Result<LedgerSnapshot, StoreError> {
        let ledger = self.ledger.read().await;
        Ok(LedgerSnapshot {
            trades: ledger.trades.clone(),
            clients: ledger.clients.values().cloned().collect(),
            movements: ledger.movements.clone(),
            splits: ledger.split_configs()?,
        })
    }

    async fn trade_keys(&self) -> Result<HashSet<String>, StoreError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.trades.iter().map(|t| t.trade_key().to_string()).collect())
    }

    async fn insert_trades(&self, trades: &[Trade]) -> Result<usize, StoreError> {
        let mut ledger = self.ledger.write().await;
        let mut keys: HashSet<String> =
            ledger.trades.iter().map(|t| t.trade_key().to_string()).collect();
        let mut inserted = 0;
        for trade in trades {
            if keys.insert(trade.trade_key().to_string()) {
                ledger.trades.push(trade.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn upsert_client(&self, client: &Client) -> Result<(), StoreError> {
        self.ledger
            .write()
            .await
            .clients
            .insert(client.client_id().clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.ledger.read().await.clients.get(client_id).cloned())
    }

    async fn insert_movement(&self, movement: &CapitalMovement) -> Result<bool, StoreError> {
        let mut ledger = self.ledger.write().await;
        if ledger
            .movements
            .iter()
            .any(|m| m.movement_id() == movement.movement_id())
        {
            return Ok(false);
        }
        ledger.movements.push(movement.clone());
        Ok(true)
    }

    async fn split_configs(&self) -> Result<SplitConfigSet, StoreError> {
        self.ledger.read().await.split_configs()
    }

    async fn save_split_config(
        &self,
        client_id: Option<&ClientId>,
        config: &SplitConfig,
    ) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().await;
        match client_id {
            Some(id) => {
                ledger.overrides.insert(id.clone(), *config);
            }
            None => ledger.global = Some(*config),
        }
        Ok(())
    }

    async fn seed_global_split_config(&self, config: &SplitConfig) -> Result<bool, StoreError> {
        let mut ledger = self.ledger.write().await;
        if ledger.global.is_some() {
            return Ok(false);
        }
        ledger.global = Some(*config);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, MovementKind, Stock};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn trade(id: &str) -> Trade {
        Trade::new(
            Some(id),
            Stock::new("AAPL"),
            date(2024, 1, 2),
            date(2024, 1, 9),
            d("100"),
            d("105"),
            d("10"),
        )
        .unwrap()
    }

    fn config() -> SplitConfig {
        SplitConfig::parse("0.25", "0.40").unwrap()
    }

    #[tokio::test]
    async fn snapshot_requires_global_config() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_snapshot().await,
            Err(StoreError::MissingGlobalConfig)
        ));

        assert!(store.seed_global_split_config(&config()).await.unwrap());
        assert!(!store
            .seed_global_split_config(&SplitConfig::parse("0", "0").unwrap())
            .await
            .unwrap());
        let snapshot = store.load_snapshot().await.unwrap();
        assert_eq!(snapshot.splits.global, config());
    }

    #[tokio::test]
    async fn duplicate_trades_are_not_inserted_twice() {
        let store = MemoryStore::new().with_global_config(config());
        assert_eq!(store.insert_trades(&[trade("1"), trade("2")]).await.unwrap(), 2);
        assert_eq!(store.insert_trades(&[trade("2"), trade("3")]).await.unwrap(), 1);
        let keys = store.trade_keys().await.unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("id:2"));
    }

    #[tokio::test]
    async fn movements_are_idempotent_by_id() {
        let store = MemoryStore::new().with_global_config(config());
        let movement = CapitalMovement::new(
            "m1",
            ClientId::new("alice"),
            date(2024, 2, 1),
            d("500"),
            MovementKind::Contribution,
            None,
        )
        .unwrap();
        assert!(store.insert_movement(&movement).await.unwrap());
        assert!(!store.insert_movement(&movement).await.unwrap());
        assert_eq!(store.load_snapshot().await.unwrap().movements.len(), 1);
    }

    #[tokio::test]
    async fn client_overrides_are_returned_with_the_global_config() {
        let alice = ClientId::new("alice");
        let store = MemoryStore::new().with_global_config(config());
        let custom = SplitConfig::parse("0.1", "0.5").unwrap();
        store.save_split_config(Some(&alice), &custom).await.unwrap();

        let set = store.split_configs().await.unwrap();
        assert_eq!(set.for_client(&alice), &custom);
        assert_eq!(set.for_client(&ClientId::new("bob")), &config());
    }
}
