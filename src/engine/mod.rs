//! Pure computation engine for monthly performance, profit splits and
//! capital progression.
//!
//! Every function here is a synchronous, side-effect-free function of an
//! immutable [`LedgerSnapshot`]. Recomputing from the same snapshot yields
//! the same [`EngineReport`].

use crate::domain::{CapitalMovement, Client, ClientId, Decimal, MonthKey, SplitConfigSet, Trade};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub mod aggregator;
pub mod progression;
pub mod split;
pub mod summary;

pub use aggregator::{aggregate_monthly, monthly_returns, MonthlyAggregate, MonthlyReturn};
pub use progression::{
    progress_client, CapitalEntry, ClientAccount, DataConsistencyError, ProgressionInput,
};
pub use split::{split_month, split_series, MonthlySplit};
pub use summary::{summarize, StrategySummary};

/// Everything one computation reads, captured at a single point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub trades: Vec<Trade>,
    pub clients: Vec<Client>,
    pub movements: Vec<CapitalMovement>,
    pub splits: SplitConfigSet,
}

/// One month of the global performance report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceRow {
    pub aggregate: MonthlyAggregate,
    pub monthly_return: MonthlyReturn,
    /// Split under the global config.
    pub split: MonthlySplit,
    /// Sum of monthly returns up to and including this month.
    pub cumulative_return_pct: Decimal,
}

/// Unfiltered engine output.
///
/// Not `Serialize`; it only leaves the crate through
/// [`crate::access::AccessFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub performance: Vec<PerformanceRow>,
    pub summary: StrategySummary,
    /// Per-client result; one client's data error never affects another.
    pub accounts: BTreeMap<ClientId, Result<ClientAccount, DataConsistencyError>>,
    /// Movements whose client is not registered.
    pub unassigned: Vec<DataConsistencyError>,
    pub splits: SplitConfigSet,
}

/// Run the whole engine over one snapshot.
///
/// `through`, when set, is the last month reported; later trades and
/// movements are ignored. Client timelines stop at the latest month with
/// data even when `through` lies beyond it.
pub fn compute_report(snapshot: &LedgerSnapshot, through: Option<MonthKey>) -> EngineReport {
    let trades: Vec<Trade> = match through {
        Some(last) => snapshot
            .trades
            .iter()
            .filter(|t| t.realization_month() <= last)
            .cloned()
            .collect(),
        None => snapshot.trades.clone(),
    };

    let aggregates = aggregate_monthly(&trades);
    let returns = monthly_returns(&aggregates);
    let global = &snapshot.splits.global;

    let mut cumulative = Decimal::zero();
    let performance: Vec<PerformanceRow> = aggregates
        .into_iter()
        .zip(returns.iter())
        .map(|(aggregate, monthly_return)| {
            cumulative += monthly_return.return_pct;
            PerformanceRow {
                split: split_month(aggregate.month, monthly_return.return_pct, global),
                aggregate,
                monthly_return: *monthly_return,
                cumulative_return_pct: cumulative,
            }
        })
        .collect();

    let summary = summarize(&trades, &returns);

    let accounts: BTreeMap<ClientId, Result<ClientAccount, DataConsistencyError>> = snapshot
        .clients
        .iter()
        .map(|client| {
            let result = progress_client(ProgressionInput {
                client,
                movements: &snapshot.movements,
                returns: &returns,
                split_config: snapshot.splits.for_client(client.client_id()),
                through,
            });
            if let Err(e) = &result {
                debug!(client_id = %client.client_id(), error = %e, "Client progression failed");
            }
            (client.client_id().clone(), result)
        })
        .collect();

    let known: HashSet<&ClientId> = snapshot.clients.iter().map(Client::client_id).collect();
    let unassigned = snapshot
        .movements
        .iter()
        .filter(|m| !known.contains(m.client_id()))
        .map(|m| DataConsistencyError::UnknownClient {
            client_id: m.client_id().clone(),
            movement_id: m.movement_id().to_string(),
            month: m.month(),
        })
        .collect();

    EngineReport {
        performance,
        summary,
        accounts,
        unassigned,
        splits: snapshot.splits.clone(),
    }
}
