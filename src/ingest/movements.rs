//! Capital-movement ingestion.

use super::{parse_date, parse_decimal, require, RecordRef, StructuralError};
use crate::domain::{CapitalMovement, ClientId, MovementKind, RecordDefect};
use serde::Deserialize;

/// One unvalidated contribution or withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRecord {
    #[serde(default)]
    pub movement_id: Option<String>,
    pub client_id: Option<String>,
    pub date: Option<String>,
    pub amount: Option<String>,
    pub kind: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MovementRecord {
    /// Validate into a movement. A fresh id is assigned when none is given.
    pub fn validate(&self) -> Result<CapitalMovement, RecordDefect> {
        let client_id = require("client_id", self.client_id.as_deref())?;
        let date = parse_date("date", require("date", self.date.as_deref())?)?;
        let kind: MovementKind = require("kind", self.kind.as_deref())?.parse()?;
        let amount = parse_decimal("amount", self.amount.as_deref())?;

        let movement_id = self
            .movement_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("mov:{}", uuid::Uuid::new_v4()));

        CapitalMovement::new(
            movement_id,
            ClientId::new(client_id),
            date,
            amount,
            kind,
            self.notes.clone(),
        )
    }
}

/// Validate a batch of movement records, keeping valid ones and reporting the rest.
pub fn ingest_movements(
    records: &[MovementRecord],
) -> (Vec<CapitalMovement>, Vec<StructuralError>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for (i, record) in records.iter().enumerate() {
        match record.validate() {
            Ok(movement) => accepted.push(movement),
            Err(defect) => rejected.push(StructuralError {
                record: RecordRef {
                    index: i + 1,
                    identity: record.movement_id.clone().or_else(|| record.client_id.clone()),
                },
                defect,
            }),
        }
    }
    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn record(client: &str, date: &str, amount: &str, kind: &str) -> MovementRecord {
        MovementRecord {
            movement_id: None,
            client_id: Some(client.to_string()),
            date: Some(date.to_string()),
            amount: Some(amount.to_string()),
            kind: Some(kind.to_string()),
            notes: None,
        }
    }

    #[test]
    fn valid_record_gets_generated_id() {
        let movement = record("alice", "2024-02-10", "2000", "contribution")
            .validate()
            .unwrap();
        assert!(movement.movement_id().starts_with("mov:"));
        assert_eq!(movement.signed_amount(), Decimal::from(2000));
    }

    #[test]
    fn negative_withdrawal_amount_is_rejected_not_flipped() {
        let result = record("alice", "2024-02-10", "-500", "withdrawal").validate();
        assert!(matches!(
            result,
            Err(RecordDefect::NotPositive { field: "amount", .. })
        ));
    }

    #[test]
    fn batch_keeps_good_records() {
        let records = vec![
            record("alice", "2024-02-10", "2000", "contribution"),
            record("alice", "not-a-date", "100", "withdrawal"),
            record("bob", "2024-03-01", "100", "gift"),
        ];
        let (accepted, rejected) = ingest_movements(&records);
        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].record.index, 2);
        assert!(matches!(
            rejected[1].defect,
            RecordDefect::UnknownMovementKind(_)
        ));
    }
}
