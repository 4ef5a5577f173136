//! Capital progression: compounding a client's balance month by month.
//!
//! The walk starts at the client's start month with the starting capital as
//! the prior balance. Each month the prior balance earns that month's global
//! return, then the month's net contributions/withdrawals are added on top
//! (end-of-month cash-flow timing). Months without a return are carried flat
//! and flagged. Balances are never clamped: an overdrawn account goes negative.

use super::aggregator::MonthlyReturn;
use super::split::{split_month, MonthlySplit};
use crate::domain::{
    sort_movements, CapitalMovement, Client, ClientId, Decimal, MonthKey, MovementKind,
    ProfitSplit, SplitConfig,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataConsistencyError {
    #[error("client {client_id} has no investment start date; its capital timeline is undefined")]
    MissingStartDate { client_id: ClientId },
    #[error("movement {movement_id} of client {client_id} is dated {month}, before the client's start month {start_month}")]
    MovementBeforeStart {
        client_id: ClientId,
        movement_id: String,
        month: MonthKey,
        start_month: MonthKey,
    },
    #[error("movement {movement_id} in {month} references unknown client {client_id}")]
    UnknownClient {
        client_id: ClientId,
        movement_id: String,
        month: MonthKey,
    },
    #[error("capital of client {client_id} exceeds the representable range in {month}")]
    BalanceOverflow { client_id: ClientId, month: MonthKey },
}

impl DataConsistencyError {
    pub fn client_id(&self) -> &ClientId {
        match self {
            DataConsistencyError::MissingStartDate { client_id }
            | DataConsistencyError::MovementBeforeStart { client_id, .. }
            | DataConsistencyError::UnknownClient { client_id, .. }
            | DataConsistencyError::BalanceOverflow { client_id, .. } => client_id,
        }
    }
}

/// One month of a client's capital timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalEntry {
    pub month: MonthKey,
    pub opening_balance: Decimal,
    pub return_pct: Decimal,
    /// No trades (or no position size) in this month; the balance was carried flat.
    pub no_data: bool,
    /// `opening_balance * return_pct / 100`
    pub return_amount: Decimal,
    /// Tax and share split of `return_amount` under the client's config.
    pub return_split: ProfitSplit,
    pub contributions: Decimal,
    pub withdrawals: Decimal,
    pub net_movement: Decimal,
    pub closing_balance: Decimal,
}

/// A client's computed account: its movements and its monthly timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAccount {
    pub client_id: ClientId,
    pub active: bool,
    pub starting_capital: Decimal,
    pub start_month: MonthKey,
    /// The client's movements within the timeline, sorted by date.
    pub movements: Vec<CapitalMovement>,
    pub timeline: Vec<CapitalEntry>,
    /// The client's share of each timeline month's return, in percentage points.
    pub splits: Vec<MonthlySplit>,
    #[serde(skip)]
    totals: AccountTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct AccountTotals {
    contributions: Decimal,
    withdrawals: Decimal,
    return_amount: Decimal,
}

impl ClientAccount {
    /// Closing balance of the last month, or the starting capital for an empty timeline.
    pub fn current_balance(&self) -> Decimal {
        self.timeline
            .last()
            .map(|e| e.closing_balance)
            .unwrap_or(self.starting_capital)
    }

    pub fn total_contributions(&self) -> Decimal {
        self.totals.contributions
    }

    pub fn total_withdrawals(&self) -> Decimal {
        self.totals.withdrawals
    }

    pub fn total_return_amount(&self) -> Decimal {
        self.totals.return_amount
    }

    pub fn is_overdrawn(&self) -> bool {
        self.current_balance().is_negative()
    }
}

/// Everything one client progression reads. All borrowed, nothing mutated.
#[derive(Debug, Clone, Copy)]
pub struct ProgressionInput<'a> {
    pub client: &'a Client,
    /// May contain other clients' movements; only this client's are used.
    pub movements: &'a [CapitalMovement],
    /// Chronological global return series.
    pub returns: &'a [MonthlyReturn],
    pub split_config: &'a SplitConfig,
    /// Last month to compute. Never extends past the latest month with a
    /// return or one of this client's movements, which is also the default.
    pub through: Option<MonthKey>,
}

/// Compute a client's capital timeline from scratch.
///
/// Deterministic: the same input always yields the same account.
pub fn progress_client(input: ProgressionInput<'_>) -> Result<ClientAccount, DataConsistencyError> {
    let client = input.client;
    let client_id = client.client_id();
    let start_month = client
        .start_month()
        .ok_or_else(|| DataConsistencyError::MissingStartDate {
            client_id: client_id.clone(),
        })?;

    let mut own: Vec<CapitalMovement> = input
        .movements
        .iter()
        .filter(|m| m.client_id() == client_id)
        .cloned()
        .collect();
    sort_movements(&mut own);

    if let Some(early) = own.iter().find(|m| m.month() < start_month) {
        return Err(DataConsistencyError::MovementBeforeStart {
            client_id: client_id.clone(),
            movement_id: early.movement_id().to_string(),
            month: early.month(),
            start_month,
        });
    }

    let last_with_data = {
        let last_return = input.returns.iter().map(|r| r.month).max();
        let last_movement = own.last().map(CapitalMovement::month);
        [Some(start_month), last_return, last_movement]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(start_month)
    };
    let last_month = input
        .through
        .map_or(last_with_data, |through| through.min(last_with_data));
    own.retain(|m| m.month() <= last_month);

    let returns: BTreeMap<MonthKey, &MonthlyReturn> =
        input.returns.iter().map(|r| (r.month, r)).collect();

    let overflow = |month: MonthKey| DataConsistencyError::BalanceOverflow {
        client_id: client_id.clone(),
        month,
    };

    let mut movements_by_month: BTreeMap<MonthKey, (Decimal, Decimal)> = BTreeMap::new();
    for m in &own {
        let slot = movements_by_month.entry(m.month()).or_default();
        let total = match m.kind() {
            MovementKind::Contribution => &mut slot.0,
            MovementKind::Withdrawal => &mut slot.1,
        };
        *total = total
            .checked_add(m.amount())
            .ok_or_else(|| overflow(m.month()))?;
    }

    let mut balance = client.starting_capital();
    let mut totals = AccountTotals::default();
    let mut timeline = Vec::new();
    let mut splits = Vec::new();

    for month in start_month.through(last_month) {
        let monthly = returns
            .get(&month)
            .map(|r| **r)
            .unwrap_or_else(|| MonthlyReturn::no_data(month));
        let (contributions, withdrawals) =
            movements_by_month.get(&month).copied().unwrap_or_default();

        let opening_balance = balance;
        let rate = monthly
            .return_pct
            .checked_div(Decimal::hundred())
            .unwrap_or_default();
        let step = || {
            let return_amount = opening_balance.checked_mul(rate)?;
            let net_movement = contributions.checked_sub(withdrawals)?;
            let closing = opening_balance
                .checked_add(return_amount)?
                .checked_add(net_movement)?;
            let running = AccountTotals {
                contributions: totals.contributions.checked_add(contributions)?,
                withdrawals: totals.withdrawals.checked_add(withdrawals)?,
                return_amount: totals.return_amount.checked_add(return_amount)?,
            };
            Some((return_amount, net_movement, closing, running))
        };
        let (return_amount, net_movement, closing, running) =
            step().ok_or_else(|| overflow(month))?;
        balance = closing;
        totals = running;

        timeline.push(CapitalEntry {
            month,
            opening_balance,
            return_pct: monthly.return_pct,
            no_data: monthly.no_data,
            return_amount,
            return_split: input.split_config.split(return_amount),
            contributions,
            withdrawals,
            net_movement,
            closing_balance: balance,
        });
        splits.push(split_month(month, monthly.return_pct, input.split_config));
    }

    Ok(ClientAccount {
        client_id: client_id.clone(),
        active: client.is_active(),
        starting_capital: client.starting_capital(),
        start_month,
        movements: own,
        timeline,
        splits,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClientId;
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn month(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    fn client(start: Option<(i32, u32, u32)>, capital: &str) -> Client {
        Client::new(
            ClientId::new("alice"),
            "Alice",
            None,
            d(capital),
            start.and_then(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day)),
        )
        .unwrap()
    }

    fn ret(m: &str, pct: &str) -> MonthlyReturn {
        MonthlyReturn {
            month: month(m),
            return_pct: d(pct),
            no_data: false,
        }
    }

    fn movement(id: &str, client: &str, on: (i32, u32, u32), amount: &str, kind: MovementKind) -> CapitalMovement {
        CapitalMovement::new(
            id,
            ClientId::new(client),
            NaiveDate::from_ymd_opt(on.0, on.1, on.2).unwrap(),
            d(amount),
            kind,
            None,
        )
        .unwrap()
    }

    fn config() -> SplitConfig {
        SplitConfig::parse("0.25", "0.40").unwrap()
    }

    fn input<'a>(
        client: &'a Client,
        movements: &'a [CapitalMovement],
        returns: &'a [MonthlyReturn],
        config: &'a SplitConfig,
    ) -> ProgressionInput<'a> {
        ProgressionInput {
            client,
            movements,
            returns,
            split_config: config,
            through: None,
        }
    }

    #[test]
    fn movements_are_added_after_compounding() {
        let alice = client(Some((2024, 1, 1)), "1000");
        let returns = vec![ret("2024-01", "10")];
        let movements = vec![movement("m1", "alice", (2024, 1, 15), "500", MovementKind::Contribution)];
        let cfg = config();
        let account = progress_client(input(&alice, &movements, &returns, &cfg)).unwrap();

        let jan = &account.timeline[0];
        assert_eq!(jan.return_amount, d("100"));
        assert_eq!(jan.closing_balance, d("1600"));
        assert_eq!(jan.return_split.profit_after_tax, d("75"));
        assert_eq!(jan.return_split.investor_amount, d("45"));
        assert_eq!(jan.return_split.trader_amount, d("30"));
    }

    #[test]
    fn gap_months_are_carried_flat_and_flagged() {
        let alice = client(Some((2024, 1, 5)), "1000");
        let returns = vec![ret("2024-01", "10"), ret("2024-03", "-10")];
        let cfg = config();
        let account = progress_client(input(&alice, &[], &returns, &cfg)).unwrap();

        let months: Vec<String> = account.timeline.iter().map(|e| e.month.to_string()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert!(account.timeline[1].no_data);
        assert_eq!(account.timeline[1].closing_balance, d("1100"));
        assert_eq!(account.current_balance(), d("990"));
    }

    #[test]
    fn starts_at_the_clients_start_month() {
        let alice = client(Some((2024, 2, 20)), "1000");
        let returns = vec![ret("2024-01", "50"), ret("2024-02", "10")];
        let cfg = config();
        let account = progress_client(input(&alice, &[], &returns, &cfg)).unwrap();
        assert_eq!(account.start_month, month("2024-02"));
        assert_eq!(account.timeline.len(), 1);
        assert_eq!(account.current_balance(), d("1100"));
    }

    #[test]
    fn overdrawn_balance_is_surfaced_not_clamped() {
        let alice = client(Some((2024, 1, 1)), "1000");
        let returns = vec![ret("2024-01", "-20")];
        let movements = vec![movement("w1", "alice", (2024, 1, 31), "900", MovementKind::Withdrawal)];
        let cfg = config();
        let account = progress_client(input(&alice, &movements, &returns, &cfg)).unwrap();
        assert_eq!(account.current_balance(), d("-100"));
        assert!(account.is_overdrawn());
        assert_eq!(account.total_withdrawals(), d("900"));
    }

    #[test]
    fn runaway_compounding_is_a_data_error() {
        let alice = client(Some((2024, 1, 1)), "1000000000000000000");
        let returns = vec![
            ret("2024-01", "1000000"),
            ret("2024-02", "1000000"),
            ret("2024-03", "1000000"),
        ];
        let cfg = config();
        let err = progress_client(input(&alice, &[], &returns, &cfg)).unwrap_err();
        assert_eq!(
            err,
            DataConsistencyError::BalanceOverflow {
                client_id: ClientId::new("alice"),
                month: month("2024-03"),
            }
        );
    }

    #[test]
    fn through_past_the_data_is_capped() {
        let alice = client(Some((2024, 1, 1)), "1000");
        let returns = vec![ret("2024-01", "5"), ret("2024-02", "5")];
        let movements = vec![movement("c1", "alice", (2024, 4, 3), "100", MovementKind::Contribution)];
        let cfg = config();
        let mut far = input(&alice, &movements, &returns, &cfg);
        far.through = MonthKey::new(i32::MAX, 12);
        let account = progress_client(far).unwrap();
        assert_eq!(account.timeline.len(), 4);
        assert_eq!(account.timeline.last().unwrap().month, month("2024-04"));
        assert_eq!(account.total_contributions(), d("100"));
    }

    #[test]
    fn missing_start_date_is_a_data_error() {
        let alice = client(None, "1000");
        let cfg = config();
        let err = progress_client(input(&alice, &[], &[ret("2024-01", "1")], &cfg)).unwrap_err();
        assert_eq!(
            err,
            DataConsistencyError::MissingStartDate {
                client_id: ClientId::new("alice")
            }
        );
    }

    #[test]
    fn movement_before_start_is_a_data_error() {
        let alice = client(Some((2024, 3, 1)), "1000");
        let movements = vec![movement("early", "alice", (2024, 2, 10), "100", MovementKind::Contribution)];
        let cfg = config();
        let err = progress_client(input(&alice, &movements, &[], &cfg)).unwrap_err();
        match err {
            DataConsistencyError::MovementBeforeStart { month: m, movement_id, .. } => {
                assert_eq!(m, month("2024-02"));
                assert_eq!(movement_id, "early");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn other_clients_movements_are_ignored() {
        let alice = client(Some((2024, 1, 1)), "1000");
        let movements = vec![movement("b1", "bob", (2024, 1, 10), "5000", MovementKind::Contribution)];
        let cfg = config();
        let account =
            progress_client(input(&alice, &movements, &[ret("2024-01", "0")], &cfg)).unwrap();
        assert!(account.movements.is_empty());
        assert_eq!(account.current_balance(), d("1000"));
    }

    #[test]
    fn movements_after_through_have_no_effect() {
        let alice = client(Some((2024, 1, 1)), "1000");
        let returns = vec![ret("2024-01", "5"), ret("2024-02", "5")];
        let movements = vec![movement("late", "alice", (2024, 3, 1), "999", MovementKind::Contribution)];
        let cfg = config();
        let mut bounded = input(&alice, &movements, &returns, &cfg);
        bounded.through = Some(month("2024-02"));
        let account = progress_client(bounded).unwrap();
        assert_eq!(account.timeline.len(), 2);
        assert!(account.movements.is_empty());
        assert_eq!(account.current_balance(), d("1102.5"));
    }

    #[test]
    fn movements_after_last_return_extend_the_timeline_flat() {
        let alice = client(Some((2024, 1, 1)), "1000");
        let returns = vec![ret("2024-01", "10")];
        let movements = vec![movement("c1", "alice", (2024, 3, 3), "50", MovementKind::Contribution)];
        let cfg = config();
        let account = progress_client(input(&alice, &movements, &returns, &cfg)).unwrap();
        assert_eq!(account.timeline.len(), 3);
        assert_eq!(account.current_balance(), d("1150"));
        assert_eq!(account.splits.len(), 3);
    }
}
