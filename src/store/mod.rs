//! Storage abstraction for the ledger: trades, clients, capital movements
//! and split configs.
//!
//! The engine never talks to storage directly. The orchestrator loads one
//! [`LedgerSnapshot`] per computation and hands it to the engine.

use crate::domain::{CapitalMovement, Client, ClientId, ConfigurationError, SplitConfig, SplitConfigSet, Trade};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use crate::engine::LedgerSnapshot;
pub use memory::MemoryStore;

/// Persistent ledger storage.
///
/// Implementations must make [`LedgerStore::load_snapshot`] read a
/// consistent view: a write racing with the load is either fully visible
/// or not at all.
#[async_trait]
pub trait LedgerStore: Send + Sync + fmt::Debug {
    /// Load everything the engine needs in one consistent read.
    async fn load_snapshot(&self) -> Result<LedgerSnapshot, StoreError>;

    /// Keys of every stored trade, for duplicate detection on upload.
    async fn trade_keys(&self) -> Result<HashSet<String>, StoreError>;

    /// Insert trades, skipping keys already present.
    ///
    /// Returns the number of newly inserted trades.
    async fn insert_trades(&self, trades: &[Trade]) -> Result<usize, StoreError>;

    /// Register a client or replace its registration.
    async fn upsert_client(&self, client: &Client) -> Result<(), StoreError>;

    async fn get_client(&self, client_id: &ClientId) -> Result<Option<Client>, StoreError>;

    /// Record a movement. Returns false if its id was already recorded.
    async fn insert_movement(&self, movement: &CapitalMovement) -> Result<bool, StoreError>;

    async fn split_configs(&self) -> Result<SplitConfigSet, StoreError>;

    /// Store the global config (`client_id = None`) or a client override.
    async fn save_split_config(
        &self,
        client_id: Option<&ClientId>,
        config: &SplitConfig,
    ) -> Result<(), StoreError>;

    /// Store `config` as the global config unless one is already stored.
    ///
    /// Returns true if the config was stored.
    async fn seed_global_split_config(&self, config: &SplitConfig) -> Result<bool, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("stored split config is invalid: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("corrupt stored row: {0}")]
    Corrupt(String),
    #[error("no global split config has been stored")]
    MissingGlobalConfig,
}
