//! Capital movement ledger event.

use crate::domain::{ClientId, Decimal, MonthKey, RecordDefect};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a capital movement. The amount itself is always a positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Contribution,
    Withdrawal,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Contribution => "contribution",
            MovementKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = RecordDefect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contribution" | "deposit" => Ok(MovementKind::Contribution),
            "withdrawal" | "withdraw" => Ok(MovementKind::Withdrawal),
            other => Err(RecordDefect::UnknownMovementKind(other.to_string())),
        }
    }
}

/// A client's contribution or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalMovement {
    movement_id: String,
    client_id: ClientId,
    date: NaiveDate,
    amount: Decimal,
    kind: MovementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl CapitalMovement {
    /// Build a movement; `amount` must be strictly positive.
    pub fn new(
        movement_id: impl Into<String>,
        client_id: ClientId,
        date: NaiveDate,
        amount: Decimal,
        kind: MovementKind,
        notes: Option<String>,
    ) -> Result<Self, RecordDefect> {
        if client_id.as_str().trim().is_empty() {
            return Err(RecordDefect::Missing("client_id"));
        }
        if !amount.is_positive() {
            return Err(RecordDefect::NotPositive {
                field: "amount",
                value: amount.to_canonical_string(),
            });
        }
        if !amount.within_record_limit() {
            return Err(RecordDefect::OutOfRange { field: "amount" });
        }
        Ok(CapitalMovement {
            movement_id: movement_id.into(),
            client_id,
            date,
            amount,
            kind,
            notes: notes.filter(|n| !n.trim().is_empty()),
        })
    }

    pub fn movement_id(&self) -> &str {
        &self.movement_id
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.date)
    }

    /// Positive for contributions, negative for withdrawals.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            MovementKind::Contribution => self.amount,
            MovementKind::Withdrawal => -self.amount,
        }
    }
}

/// Sort movements by (date, movement_id) so equal-date movements have a stable order.
pub fn sort_movements(movements: &mut [CapitalMovement]) {
    movements.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.movement_id.cmp(&b.movement_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn movement(id: &str, on: NaiveDate, amount: &str, kind: MovementKind) -> CapitalMovement {
        CapitalMovement::new(
            id,
            ClientId::new("alice"),
            on,
            Decimal::from_str_canonical(amount).unwrap(),
            kind,
            None,
        )
        .unwrap()
    }

    #[test]
    fn withdrawal_sign_comes_from_kind() {
        let w = movement("m1", date(2024, 2, 1), "250", MovementKind::Withdrawal);
        assert_eq!(w.amount(), Decimal::from(250));
        assert_eq!(w.signed_amount(), Decimal::from(-250));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let result = CapitalMovement::new(
            "m1",
            ClientId::new("alice"),
            date(2024, 2, 1),
            Decimal::from(-5),
            MovementKind::Withdrawal,
            None,
        );
        assert!(matches!(
            result,
            Err(RecordDefect::NotPositive { field: "amount", .. })
        ));
    }

    #[test]
    fn rejects_amounts_beyond_record_limit() {
        let result = CapitalMovement::new(
            "m1",
            ClientId::new("alice"),
            date(2024, 2, 1),
            Decimal::from_str_canonical("5e27").unwrap(),
            MovementKind::Contribution,
            None,
        );
        assert_eq!(result, Err(RecordDefect::OutOfRange { field: "amount" }));
    }

    #[test]
    fn kind_parses_common_spellings() {
        assert_eq!("Contribution".parse::<MovementKind>(), Ok(MovementKind::Contribution));
        assert_eq!("withdraw".parse::<MovementKind>(), Ok(MovementKind::Withdrawal));
        assert!("refund".parse::<MovementKind>().is_err());
    }

    #[test]
    fn sort_is_by_date_then_id() {
        let mut movements = vec![
            movement("b", date(2024, 3, 1), "1", MovementKind::Contribution),
            movement("z", date(2024, 1, 1), "1", MovementKind::Contribution),
            movement("a", date(2024, 3, 1), "1", MovementKind::Withdrawal),
        ];
        sort_movements(&mut movements);
        let ids: Vec<_> = movements.iter().map(|m| m.movement_id()).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }
}
