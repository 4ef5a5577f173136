use crate::domain::{Decimal, SplitConfig};
use crate::ingest::IngestOptions;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Seeds the global split config when the ledger holds none yet.
    pub default_split: SplitConfig,
    pub drop_same_day_trades: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let tax_rate = parse_rate(&env_map, "TAX_RATE", "0.25")?;
        let trader_share = parse_rate(&env_map, "TRADER_SHARE", "0.40")?;
        let default_split = SplitConfig::new(tax_rate, trader_share).map_err(|e| {
            ConfigError::InvalidValue("TAX_RATE/TRADER_SHARE".to_string(), e.to_string())
        })?;

        let drop_same_day_trades = match env_map
            .get("DROP_SAME_DAY_TRADES")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
            .unwrap_or("true")
        {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "DROP_SAME_DAY_TRADES".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            default_split,
            drop_same_day_trades,
        })
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            drop_same_day_trades: self.drop_same_day_trades,
        }
    }
}

fn parse_rate(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("must be a decimal, got {}", raw))
    })
}
