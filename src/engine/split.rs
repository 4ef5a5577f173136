//! Profit-split calculation for monthly returns.

use super::aggregator::MonthlyReturn;
use crate::domain::{Decimal, MonthKey, ProfitSplit, SplitConfig};
use serde::Serialize;

/// A month's return after tax, divided between investor and trader.
///
/// All three amounts are in percentage points of capital, like the return
/// they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySplit {
    pub month: MonthKey,
    pub profit_after_tax: Decimal,
    pub investor_amount: Decimal,
    pub trader_amount: Decimal,
}

impl MonthlySplit {
    pub fn parts(&self) -> ProfitSplit {
        ProfitSplit {
            profit_after_tax: self.profit_after_tax,
            investor_amount: self.investor_amount,
            trader_amount: self.trader_amount,
        }
    }
}

/// Split one month's return under `config`.
///
/// A losing month produces negative amounts, shared in the same proportions.
pub fn split_month(month: MonthKey, monthly_return_pct: Decimal, config: &SplitConfig) -> MonthlySplit {
    let ProfitSplit {
        profit_after_tax,
        investor_amount,
        trader_amount,
    } = config.split(monthly_return_pct);
    MonthlySplit {
        month,
        profit_after_tax,
        investor_amount,
        trader_amount,
    }
}

/// Split every month of a return series under the same config snapshot.
pub fn split_series(returns: &[MonthlyReturn], config: &SplitConfig) -> Vec<MonthlySplit> {
    returns
        .iter()
        .map(|r| split_month(r.month, r.return_pct, config))
        .collect()
}
