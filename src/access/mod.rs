//! Role-based access filter: the only way engine output leaves the crate.
//!
//! [`AccessFilter::apply`] consumes an [`EngineReport`] and produces a view
//! restricted to what the caller's [`Role`] may see. Client views never carry
//! position sizes, trade counts, split configs or another client's data.

use crate::domain::{ClientId, Decimal, MonthKey, SplitConfigSet};
use crate::engine::{
    ClientAccount, DataConsistencyError, EngineReport, MonthlyAggregate, MonthlySplit,
    PerformanceRow, StrategySummary,
};
use serde::Serialize;
use thiserror::Error;

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Client(ClientId),
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("client {0} is not registered")]
    UnknownClient(ClientId),
    #[error("this operation requires the admin role")]
    AdminOnly,
}

/// A capability-restricted report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum ReportView {
    Admin(AdminView),
    Client(ClientView),
}

/// Everything: full aggregates, every client, the split configs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub months: Vec<AdminMonthView>,
    pub summary: StrategySummary,
    pub split_configs: SplitConfigSet,
    pub clients: Vec<ClientOutcome>,
    /// Data problems not attributable to a registered client.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMonthView {
    #[serde(flatten)]
    pub aggregate: MonthlyAggregate,
    pub return_pct: Decimal,
    pub no_data: bool,
    pub win_rate_pct: Decimal,
    pub cumulative_return_pct: Decimal,
    pub split: MonthlySplit,
}

/// A client's account, or why it could not be computed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOutcome {
    pub client_id: ClientId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[serde(flatten)]
    pub account: ClientAccount,
    pub current_balance: Decimal,
    pub total_contributions: Decimal,
    pub total_withdrawals: Decimal,
    pub total_return_amount: Decimal,
    pub overdrawn: bool,
}

/// One client's own data plus ratio-only global performance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    pub client_id: ClientId,
    pub months: Vec<ClientMonthView>,
    pub summary: ClientSummaryView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMonthView {
    pub month: MonthKey,
    pub return_pct: Decimal,
    pub no_data: bool,
    pub win_rate_pct: Decimal,
    pub cumulative_return_pct: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummaryView {
    pub win_rate_pct: Decimal,
    pub overall_return_pct: Decimal,
    pub cumulative_return_pct: Decimal,
    pub avg_winner_pct: Decimal,
    pub avg_loser_pct: Decimal,
}

impl From<&StrategySummary> for ClientSummaryView {
    fn from(s: &StrategySummary) -> Self {
        ClientSummaryView {
            win_rate_pct: s.win_rate_pct,
            overall_return_pct: s.overall_return_pct,
            cumulative_return_pct: s.cumulative_return_pct,
            avg_winner_pct: s.avg_winner_pct,
            avg_loser_pct: s.avg_loser_pct,
        }
    }
}

impl From<&PerformanceRow> for ClientMonthView {
    fn from(row: &PerformanceRow) -> Self {
        ClientMonthView {
            month: row.aggregate.month,
            return_pct: row.monthly_return.return_pct,
            no_data: row.monthly_return.no_data,
            win_rate_pct: row.aggregate.win_rate_pct(),
            cumulative_return_pct: row.cumulative_return_pct,
        }
    }
}

impl From<PerformanceRow> for AdminMonthView {
    fn from(row: PerformanceRow) -> Self {
        AdminMonthView {
            return_pct: row.monthly_return.return_pct,
            no_data: row.monthly_return.no_data,
            win_rate_pct: row.aggregate.win_rate_pct(),
            cumulative_return_pct: row.cumulative_return_pct,
            split: row.split,
            aggregate: row.aggregate,
        }
    }
}

impl From<ClientAccount> for AccountView {
    fn from(account: ClientAccount) -> Self {
        AccountView {
            current_balance: account.current_balance(),
            total_contributions: account.total_contributions(),
            total_withdrawals: account.total_withdrawals(),
            total_return_amount: account.total_return_amount(),
            overdrawn: account.is_overdrawn(),
            account,
        }
    }
}

fn outcome(
    client_id: ClientId,
    result: Result<ClientAccount, DataConsistencyError>,
) -> ClientOutcome {
    match result {
        Ok(account) => ClientOutcome {
            client_id,
            account: Some(account.into()),
            error: None,
        },
        Err(e) => ClientOutcome {
            client_id,
            account: None,
            error: Some(e.to_string()),
        },
    }
}

/// The single choke point between engine output and callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessFilter;

impl AccessFilter {
    /// Gate for ledger writes and other admin-only operations.
    pub fn require_admin(role: &Role) -> Result<(), AccessError> {
        match role {
            Role::Admin => Ok(()),
            Role::Client(_) => Err(AccessError::AdminOnly),
        }
    }

    /// Split configs are visible to admins only.
    pub fn split_configs(role: &Role, configs: SplitConfigSet) -> Result<SplitConfigSet, AccessError> {
        Self::require_admin(role)?;
        Ok(configs)
    }

    pub fn apply(role: &Role, report: EngineReport) -> Result<ReportView, AccessError> {
        match role {
            Role::Admin => Ok(ReportView::Admin(AdminView {
                months: report.performance.into_iter().map(Into::into).collect(),
                summary: report.summary,
                split_configs: report.splits,
                clients: report
                    .accounts
                    .into_iter()
                    .map(|(id, result)| outcome(id, result))
                    .collect(),
                issues: report.unassigned.iter().map(ToString::to_string).collect(),
            })),
            Role::Client(client_id) => {
                let EngineReport {
                    performance,
                    summary,
                    mut accounts,
                    ..
                } = report;
                let result = accounts
                    .remove(client_id)
                    .ok_or_else(|| AccessError::UnknownClient(client_id.clone()))?;
                let own = outcome(client_id.clone(), result);
                Ok(ReportView::Client(ClientView {
                    client_id: own.client_id,
                    months: performance.iter().map(Into::into).collect(),
                    summary: (&summary).into(),
                    account: own.account,
                    error: own.error,
                }))
            }
        }
    }
}
