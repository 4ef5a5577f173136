use crate::access::{AccessError, AccessFilter, Role};
use crate::domain::{
    CapitalMovement, Client, ClientId, ConfigurationError, RecordDefect, SplitConfig,
    SplitConfigSet,
};
use crate::engine::DataConsistencyError;
use crate::ingest::{ingest_trade_log, ClientRecord, IngestOptions, LogFormatError, MovementRecord};
use crate::store::{LedgerStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Write side: validates incoming records and appends them to the ledger.
///
/// Every operation is admin-only.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn LedgerStore>,
    options: IngestOptions,
}

/// Outcome of one trade-log upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    /// Valid, non-duplicate trades in the file.
    pub accepted: usize,
    /// Trades actually written.
    pub inserted: usize,
    pub duplicates: usize,
    pub same_day_dropped: usize,
    /// One line per rejected row.
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementOutcome {
    pub movement: CapitalMovement,
    /// False when a movement with the same id was already recorded.
    pub created: bool,
}

impl Ingestor {
    pub fn new(store: Arc<dyn LedgerStore>, options: IngestOptions) -> Self {
        Self { store, options }
    }

    /// Parse a CSV trade log and append its valid, new trades.
    pub async fn upload_trades(&self, role: &Role, csv: &[u8]) -> Result<UploadSummary, IngestionError> {
        AccessFilter::require_admin(role)?;

        let existing = self.store.trade_keys().await?;
        let batch = ingest_trade_log(csv, &existing, self.options)?;
        let inserted = self.store.insert_trades(&batch.accepted).await?;

        let summary = UploadSummary {
            accepted: batch.accepted.len(),
            inserted,
            // A concurrent upload may have stored some of the same trades in between.
            duplicates: batch.duplicates + (batch.accepted.len() - inserted),
            same_day_dropped: batch.same_day_dropped,
            rejected: batch.rejected.iter().map(ToString::to_string).collect(),
        };
        info!(
            accepted = summary.accepted,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            same_day_dropped = summary.same_day_dropped,
            rejected = summary.rejected.len(),
            "Trade log uploaded"
        );
        Ok(summary)
    }

    /// Register a client or replace its registration.
    pub async fn register_client(&self, role: &Role, record: &ClientRecord) -> Result<Client, IngestionError> {
        AccessFilter::require_admin(role)?;
        let client = record.validate()?;
        self.store.upsert_client(&client).await?;
        info!(
            client_id = %client.client_id(),
            starting_capital = %client.starting_capital(),
            active = client.is_active(),
            "Client registered"
        );
        Ok(client)
    }

    /// Record a contribution or withdrawal for a registered client.
    pub async fn record_movement(
        &self,
        role: &Role,
        record: &MovementRecord,
    ) -> Result<MovementOutcome, IngestionError> {
        AccessFilter::require_admin(role)?;
        let movement = record.validate()?;

        let client = self
            .store
            .get_client(movement.client_id())
            .await?
            .ok_or_else(|| IngestionError::UnknownClient(movement.client_id().clone()))?;
        if let Some(start_month) = client.start_month() {
            if movement.month() < start_month {
                return Err(DataConsistencyError::MovementBeforeStart {
                    client_id: client.client_id().clone(),
                    movement_id: movement.movement_id().to_string(),
                    month: movement.month(),
                    start_month,
                }
                .into());
            }
        }

        let created = self.store.insert_movement(&movement).await?;
        info!(
            movement_id = movement.movement_id(),
            client_id = %movement.client_id(),
            kind = %movement.kind(),
            amount = %movement.amount(),
            created,
            "Capital movement recorded"
        );
        Ok(MovementOutcome { movement, created })
    }

    /// Replace the global config (`client_id = None`) or one client's override.
    ///
    /// Returns the full set as it stands after the update.
    pub async fn update_split_config(
        &self,
        role: &Role,
        client_id: Option<&ClientId>,
        config: SplitConfig,
    ) -> Result<SplitConfigSet, IngestionError> {
        AccessFilter::require_admin(role)?;
        if let Some(id) = client_id {
            if self.store.get_client(id).await?.is_none() {
                return Err(IngestionError::UnknownClient(id.clone()));
            }
        }
        self.store.save_split_config(client_id, &config).await?;
        Ok(self.store.split_configs().await?)
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    LogFormat(#[from] LogFormatError),
    #[error("invalid record: {0}")]
    Invalid(#[from] RecordDefect),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Consistency(#[from] DataConsistencyError),
    #[error("client {0} is not registered")]
    UnknownClient(ClientId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ingestor(drop_same_day_trades: bool) -> (Arc<MemoryStore>, Ingestor) {
        let store = Arc::new(
            MemoryStore::new().with_global_config(SplitConfig::parse("0.25", "0.40").unwrap()),
        );
        let ingestor = Ingestor::new(store.clone(), IngestOptions { drop_same_day_trades });
        (store, ingestor)
    }

    const LOG: &str = "Stock,Buy Date,Sell Date,Buy Price,Sell Price,Quantity\n\
AAPL,2024-01-02,2024-01-10,150,155,100\n\
MSFT,2024-01-05,2024-01-05,400,404,10\n\
NVDA,2024-01-08,2024-01-04,500,510,1\n";

    fn client_record(id: &str, start: &str) -> ClientRecord {
        ClientRecord {
            client_id: Some(id.to_string()),
            starting_capital: Some("10000".to_string()),
            start_date: Some(start.to_string()),
            ..Default::default()
        }
    }

    fn movement_record(id: &str, client: &str, date: &str) -> MovementRecord {
        MovementRecord {
            movement_id: Some(id.to_string()),
            client_id: Some(client.to_string()),
            date: Some(date.to_string()),
            amount: Some("500".to_string()),
            kind: Some("contribution".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn upload_counts_every_outcome() {
        let (_, ingestor) = ingestor(true);
        let summary = ingestor.upload_trades(&Role::Admin, LOG.as_bytes()).await.unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.same_day_dropped, 1);
        assert_eq!(summary.rejected.len(), 1);

        let again = ingestor.upload_trades(&Role::Admin, LOG.as_bytes()).await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 1);
    }

    #[tokio::test]
    async fn clients_cannot_write() {
        let (_, ingestor) = ingestor(false);
        let role = Role::Client(ClientId::new("alice"));
        assert!(matches!(
            ingestor.upload_trades(&role, LOG.as_bytes()).await,
            Err(IngestionError::Access(AccessError::AdminOnly))
        ));
        assert!(matches!(
            ingestor.register_client(&role, &client_record("alice", "2024-01-01")).await,
            Err(IngestionError::Access(AccessError::AdminOnly))
        ));
    }

    #[tokio::test]
    async fn movement_requires_a_registered_client() {
        let (_, ingestor) = ingestor(false);
        let err = ingestor
            .record_movement(&Role::Admin, &movement_record("m1", "ghost", "2024-02-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::UnknownClient(_)));
    }

    #[tokio::test]
    async fn movement_before_start_month_is_refused() {
        let (_, ingestor) = ingestor(false);
        ingestor
            .register_client(&Role::Admin, &client_record("alice", "2024-03-01"))
            .await
            .unwrap();
        let err = ingestor
            .record_movement(&Role::Admin, &movement_record("m1", "alice", "2024-02-28"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestionError::Consistency(DataConsistencyError::MovementBeforeStart { .. })
        ));
    }

    #[tokio::test]
    async fn movement_is_recorded_once() {
        let (store, ingestor) = ingestor(false);
        ingestor
            .register_client(&Role::Admin, &client_record("alice", "2024-01-01"))
            .await
            .unwrap();
        let first = ingestor
            .record_movement(&Role::Admin, &movement_record("m1", "alice", "2024-02-01"))
            .await
            .unwrap();
        let second = ingestor
            .record_movement(&Role::Admin, &movement_record("m1", "alice", "2024-02-01"))
            .await
            .unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(store.load_snapshot().await.unwrap().movements.len(), 1);
    }

    #[tokio::test]
    async fn override_for_unknown_client_is_refused() {
        let (_, ingestor) = ingestor(false);
        let err = ingestor
            .update_split_config(
                &Role::Admin,
                Some(&ClientId::new("ghost")),
                SplitConfig::parse("0.1", "0.5").unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::UnknownClient(_)));
    }

    #[tokio::test]
    async fn global_config_update_is_visible() {
        let (_, ingestor) = ingestor(false);
        let updated = SplitConfig::parse("0.3", "0.5").unwrap();
        let set = ingestor
            .update_split_config(&Role::Admin, None, updated)
            .await
            .unwrap();
        assert_eq!(set.global, updated);
    }
}
