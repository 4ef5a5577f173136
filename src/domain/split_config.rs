//! Tax and profit-share configuration.
//!
//! A [`SplitConfig`] can only exist in a valid state: both rates in `[0, 1]`
//! and investor share equal to `1 - trader_share`. A [`SplitConfigSet`] is the
//! snapshot handed to one computation: the global config plus per-client
//! overrides.

use crate::domain::{ClientId, Decimal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: String },
    #[error("trader_share {trader} and investor_share {investor} must sum to 1")]
    SharesDoNotSumToOne { trader: String, investor: String },
    #[error("{field} is not a valid number: {value:?}")]
    Unparsable { field: &'static str, value: String },
}

/// The split of one profit figure (a percentage or an amount of money).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSplit {
    pub profit_after_tax: Decimal,
    pub investor_amount: Decimal,
    pub trader_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSplitConfig")]
pub struct SplitConfig {
    tax_rate: Decimal,
    trader_share: Decimal,
}

/// Unvalidated wire form of a split config.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSplitConfig {
    pub tax_rate: Decimal,
    pub trader_share: Decimal,
    #[serde(default)]
    pub investor_share: Option<Decimal>,
}

impl TryFrom<RawSplitConfig> for SplitConfig {
    type Error = ConfigurationError;

    fn try_from(raw: RawSplitConfig) -> Result<Self, Self::Error> {
        match raw.investor_share {
            Some(investor) => SplitConfig::with_shares(raw.tax_rate, raw.trader_share, investor),
            None => SplitConfig::new(raw.tax_rate, raw.trader_share),
        }
    }
}

impl SplitConfig {
    pub fn new(tax_rate: Decimal, trader_share: Decimal) -> Result<Self, ConfigurationError> {
        check_unit("tax_rate", tax_rate)?;
        check_unit("trader_share", trader_share)?;
        Ok(SplitConfig {
            tax_rate,
            trader_share,
        })
    }

    /// Build from explicitly stated shares, which must be complementary.
    pub fn with_shares(
        tax_rate: Decimal,
        trader_share: Decimal,
        investor_share: Decimal,
    ) -> Result<Self, ConfigurationError> {
        check_unit("investor_share", investor_share)?;
        let config = Self::new(tax_rate, trader_share)?;
        if trader_share + investor_share != Decimal::one() {
            return Err(ConfigurationError::SharesDoNotSumToOne {
                trader: trader_share.to_canonical_string(),
                investor: investor_share.to_canonical_string(),
            });
        }
        Ok(config)
    }

    /// Parse the textual form used by environment variables and the store.
    pub fn parse(tax_rate: &str, trader_share: &str) -> Result<Self, ConfigurationError> {
        let parse = |field: &'static str, value: &str| {
            Decimal::from_str_canonical(value).map_err(|_| ConfigurationError::Unparsable {
                field,
                value: value.to_string(),
            })
        };
        Self::new(parse("tax_rate", tax_rate)?, parse("trader_share", trader_share)?)
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn trader_share(&self) -> Decimal {
        self.trader_share
    }

    pub fn investor_share(&self) -> Decimal {
        Decimal::one() - self.trader_share
    }

    /// Apply tax, then divide what remains between investor and trader.
    ///
    /// Losses are split in the same proportions as gains. The trader amount is
    /// the remainder, so `investor_amount + trader_amount == profit_after_tax`
    /// holds exactly.
    pub fn split(&self, profit: Decimal) -> ProfitSplit {
        let profit_after_tax = profit * (Decimal::one() - self.tax_rate);
        let investor_amount = profit_after_tax * self.investor_share();
        ProfitSplit {
            profit_after_tax,
            investor_amount,
            trader_amount: profit_after_tax - investor_amount,
        }
    }
}

fn check_unit(field: &'static str, value: Decimal) -> Result<(), ConfigurationError> {
    if value.is_unit_interval() {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            field,
            value: value.to_canonical_string(),
        })
    }
}

/// Global split config plus per-client overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfigSet {
    pub global: SplitConfig,
    pub clients: BTreeMap<ClientId, SplitConfig>,
}

impl SplitConfigSet {
    pub fn new(global: SplitConfig) -> Self {
        Self {
            global,
            clients: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, client_id: ClientId, config: SplitConfig) -> Self {
        self.clients.insert(client_id, config);
        self
    }

    /// The config that applies to `client_id`: its override, else the global one.
    pub fn for_client(&self, client_id: &ClientId) -> &SplitConfig {
        self.clients.get(client_id).unwrap_or(&self.global)
    }
}
