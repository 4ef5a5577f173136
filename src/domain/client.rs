//! Registered investing client.

use crate::domain::{ClientId, Decimal, MonthKey, RecordDefect};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    client_id: ClientId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    starting_capital: Decimal,
    start_date: Option<NaiveDate>,
    active: bool,
}

impl Client {
    /// Register a client. `starting_capital` must not be negative.
    ///
    /// `start_date` may be left unset at registration, but the client then has
    /// no capital timeline until one is recorded.
    pub fn new(
        client_id: ClientId,
        name: impl Into<String>,
        email: Option<String>,
        starting_capital: Decimal,
        start_date: Option<NaiveDate>,
    ) -> Result<Self, RecordDefect> {
        if client_id.as_str().trim().is_empty() {
            return Err(RecordDefect::Missing("client_id"));
        }
        if starting_capital.is_negative() {
            return Err(RecordDefect::Negative {
                field: "starting_capital",
                value: starting_capital.to_canonical_string(),
            });
        }
        if !starting_capital.within_record_limit() {
            return Err(RecordDefect::OutOfRange {
                field: "starting_capital",
            });
        }
        Ok(Client {
            client_id,
            name: name.into(),
            email: email.filter(|e| !e.trim().is_empty()),
            starting_capital,
            start_date,
            active: true,
        })
    }

    /// Soft-deactivate or reactivate the client.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn starting_capital(&self) -> Decimal {
        self.starting_capital
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// The month containing the start date, if one is recorded.
    pub fn start_month(&self) -> Option<MonthKey> {
        self.start_date.map(MonthKey::of)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
