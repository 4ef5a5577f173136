//! Whole-ledger strategy summary.

use super::aggregator::MonthlyReturn;
use crate::domain::{Decimal, Trade};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Decimal,
    pub total_pnl: Decimal,
    pub total_position_size: Decimal,
    pub avg_winner: Decimal,
    pub avg_loser: Decimal,
    pub avg_winner_pct: Decimal,
    pub avg_loser_pct: Decimal,
    /// `total_pnl / total_position_size * 100`, 0 without any position.
    pub overall_return_pct: Decimal,
    /// Sum of the monthly returns.
    pub cumulative_return_pct: Decimal,
}

fn mean(values: impl Iterator<Item = Decimal>) -> Decimal {
    let (sum, n) = values.fold((Decimal::zero(), 0usize), |(s, n), v| (s + v, n + 1));
    sum.checked_div(Decimal::from_count(n)).unwrap_or_default()
}

/// Summarize the whole ledger. Empty ledgers produce an all-zero summary.
pub fn summarize(trades: &[Trade], returns: &[MonthlyReturn]) -> StrategySummary {
    if trades.is_empty() {
        return StrategySummary::default();
    }

    let total_trades = trades.len();
    let winning_trades = trades.iter().filter(|t| t.is_win()).count();
    let total_pnl: Decimal = trades.iter().map(Trade::pnl).sum();
    let total_position_size: Decimal = trades.iter().map(Trade::position_size).sum();

    let winners = || trades.iter().filter(|t| t.pnl().is_positive());
    let losers = || trades.iter().filter(|t| t.pnl().is_negative());

    StrategySummary {
        total_trades,
        winning_trades,
        losing_trades: total_trades - winning_trades,
        win_rate_pct: Decimal::from_count(winning_trades)
            .percent_of(Decimal::from_count(total_trades))
            .unwrap_or_default(),
        total_pnl,
        total_position_size,
        avg_winner: mean(winners().map(Trade::pnl)),
        avg_loser: mean(losers().map(Trade::pnl)),
        avg_winner_pct: mean(winners().map(Trade::return_pct)),
        avg_loser_pct: mean(losers().map(Trade::return_pct)),
        overall_return_pct: total_pnl.percent_of(total_position_size).unwrap_or_default(),
        cumulative_return_pct: returns.iter().map(|r| r.return_pct).sum(),
    }
}
