//! Monthly performance aggregation over the trade ledger.

use crate::domain::{Decimal, MonthKey, Trade};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Aggregate performance of every trade realized in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAggregate {
    pub month: MonthKey,
    pub total_pnl: Decimal,
    pub total_position_size: Decimal,
    pub trade_count: usize,
    pub win_count: usize,
    /// Mean per-trade return of winning trades, in percent (0 when none).
    pub avg_win_pct: Decimal,
    /// Mean per-trade return of losing trades, in percent (0 when none).
    pub avg_loss_pct: Decimal,
    /// A running total did not fit; the month's totals are partial and its
    /// return is reported as a flagged 0%.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub overflowed: bool,
}

/// A month's global return, flagged when there was nothing to divide by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReturn {
    pub month: MonthKey,
    pub return_pct: Decimal,
    pub no_data: bool,
}

impl MonthlyReturn {
    /// A month with no usable position data: 0%, flagged.
    pub fn no_data(month: MonthKey) -> Self {
        MonthlyReturn {
            month,
            return_pct: Decimal::zero(),
            no_data: true,
        }
    }
}

impl MonthlyAggregate {
    pub fn loss_count(&self) -> usize {
        self.trade_count - self.win_count
    }

    /// `total_pnl / total_position_size * 100`, or a flagged 0% when the
    /// position size is zero.
    pub fn monthly_return(&self) -> MonthlyReturn {
        if self.overflowed || !self.total_position_size.is_positive() {
            return MonthlyReturn::no_data(self.month);
        }
        match self.total_pnl.percent_of(self.total_position_size) {
            Some(return_pct) => MonthlyReturn {
                month: self.month,
                return_pct,
                no_data: false,
            },
            None => MonthlyReturn::no_data(self.month),
        }
    }

    pub fn win_rate_pct(&self) -> Decimal {
        Decimal::from_count(self.win_count)
            .percent_of(Decimal::from_count(self.trade_count))
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Bucket {
    total_pnl: Decimal,
    total_position_size: Decimal,
    trade_count: usize,
    win_count: usize,
    win_pct_sum: Decimal,
    loss_pct_sum: Decimal,
    overflowed: bool,
}

impl Bucket {
    /// Fold one trade in. Leaves the bucket untouched when a total would overflow.
    fn add(&mut self, trade: &Trade) -> Option<()> {
        let total_pnl = self.total_pnl.checked_add(trade.pnl())?;
        let total_position_size = self.total_position_size.checked_add(trade.position_size())?;
        let (win_pct_sum, loss_pct_sum) = if trade.is_win() {
            (self.win_pct_sum.checked_add(trade.return_pct())?, self.loss_pct_sum)
        } else {
            (self.win_pct_sum, self.loss_pct_sum.checked_add(trade.return_pct())?)
        };

        self.total_pnl = total_pnl;
        self.total_position_size = total_position_size;
        self.win_pct_sum = win_pct_sum;
        self.loss_pct_sum = loss_pct_sum;
        self.trade_count += 1;
        if trade.is_win() {
            self.win_count += 1;
        }
        Some(())
    }
}

fn mean(sum: Decimal, count: usize) -> Decimal {
    sum.checked_div(Decimal::from_count(count)).unwrap_or_default()
}

/// Group trades by the month of their sell date and aggregate each month.
///
/// Input order does not matter; the output is ordered by month. An empty
/// ledger yields an empty sequence.
pub fn aggregate_monthly(trades: &[Trade]) -> Vec<MonthlyAggregate> {
    let mut buckets: BTreeMap<MonthKey, Bucket> = BTreeMap::new();

    for trade in trades {
        let month = trade.realization_month();
        let bucket = buckets.entry(month).or_default();
        if bucket.overflowed {
            continue;
        }
        if bucket.add(trade).is_none() {
            warn!(%month, trade_key = trade.trade_key(), "Monthly totals overflowed");
            bucket.overflowed = true;
        }
    }

    buckets
        .into_iter()
        .map(|(month, b)| MonthlyAggregate {
            month,
            total_pnl: b.total_pnl,
            total_position_size: b.total_position_size,
            trade_count: b.trade_count,
            win_count: b.win_count,
            avg_win_pct: mean(b.win_pct_sum, b.win_count),
            avg_loss_pct: mean(b.loss_pct_sum, b.trade_count - b.win_count),
            overflowed: b.overflowed,
        })
        .collect()
}

/// The return series of an aggregate sequence, in the same order.
pub fn monthly_returns(aggregates: &[MonthlyAggregate]) -> Vec<MonthlyReturn> {
    aggregates.iter().map(MonthlyAggregate::monthly_return).collect()
}
