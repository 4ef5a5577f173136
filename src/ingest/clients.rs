//! Client registration records.

use super::{parse_date, parse_decimal, require};
use crate::domain::{Client, ClientId, RecordDefect};
use serde::Deserialize;

/// One unvalidated client registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub starting_capital: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ClientRecord {
    /// Validate into a client. The name defaults to the client id, `active` to true.
    pub fn validate(&self) -> Result<Client, RecordDefect> {
        let client_id = require("client_id", self.client_id.as_deref())?;
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(client_id);
        let starting_capital = parse_decimal("starting_capital", self.starting_capital.as_deref())?;
        let start_date = self
            .start_date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_date("start_date", s))
            .transpose()?;

        Ok(Client::new(
            ClientId::new(client_id),
            name,
            self.email.clone(),
            starting_capital,
            start_date,
        )?
        .with_active(self.active.unwrap_or(true)))
    }
}
