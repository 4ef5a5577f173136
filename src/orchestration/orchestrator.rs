use crate::access::{AccessError, AccessFilter, ReportView, Role};
use crate::domain::{MonthKey, SplitConfigSet};
use crate::engine::compute_report;
use crate::store::{LedgerStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Read side: snapshot, compute, filter.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn LedgerStore>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Compute the report from one consistent snapshot and filter it for `role`.
    ///
    /// Nothing is cached: every call recomputes from the current ledger.
    pub async fn report(
        &self,
        role: &Role,
        through: Option<MonthKey>,
    ) -> Result<ReportView, OrchestrationError> {
        let snapshot = self.store.load_snapshot().await?;
        let report = compute_report(&snapshot, through);

        let failed = report.accounts.values().filter(|r| r.is_err()).count();
        if failed > 0 || !report.unassigned.is_empty() {
            warn!(
                failed_clients = failed,
                unassigned_movements = report.unassigned.len(),
                "Report computed with data consistency errors"
            );
        }
        info!(
            months = report.performance.len(),
            clients = report.accounts.len(),
            through = through.map(|m| m.to_string()),
            "Report computed"
        );

        Ok(AccessFilter::apply(role, report)?)
    }

    /// The store is reachable and holds a global split config, so reports can
    /// be computed.
    pub async fn check_ready(&self) -> Result<(), StoreError> {
        self.store.split_configs().await.map(|_| ())
    }

    pub async fn split_configs(&self, role: &Role) -> Result<SplitConfigSet, OrchestrationError> {
        AccessFilter::require_admin(role)?;
        let configs = self.store.split_configs().await?;
        Ok(AccessFilter::split_configs(role, configs)?)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Client, ClientId, Decimal, SplitConfig, Stock, Trade};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn orchestrator() -> Orchestrator {
        let trade = Trade::new(
            None,
            Stock::new("AAPL"),
            date(2024, 1, 2),
            date(2024, 1, 30),
            d("150"),
            d("155"),
            d("100"),
        )
        .unwrap();
        let store = MemoryStore::new()
            .with_global_config(SplitConfig::parse("0.25", "0.40").unwrap())
            .with_trades(vec![trade])
            .with_client(
                Client::new(ClientId::new("alice"), "Alice", None, d("10000"), Some(date(2024, 1, 1)))
                    .unwrap(),
            );
        Orchestrator::new(Arc::new(store))
    }

    #[tokio::test]
    async fn admin_report_contains_every_client() {
        let view = orchestrator().report(&Role::Admin, None).await.unwrap();
        let ReportView::Admin(admin) = view else {
            panic!("expected admin view");
        };
        assert_eq!(admin.clients.len(), 1);
        assert_eq!(admin.months.len(), 1);
    }

    #[tokio::test]
    async fn unknown_client_is_refused() {
        let err = orchestrator()
            .report(&Role::Client(ClientId::new("eve")), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Access(AccessError::UnknownClient(_))
        ));
    }

    #[tokio::test]
    async fn clients_cannot_read_split_configs() {
        let err = orchestrator()
            .split_configs(&Role::Client(ClientId::new("alice")))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Access(AccessError::AdminOnly)));
    }
}
