//! Ledger configuration

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::types::{LedgerError, LedgerResult, DEFAULT_SCALE};

/// Settings inherited from the owning organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// ISO currency code for every monetary field
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Fractional digits carried by monetary fields
    #[serde(default = "default_scale")]
    pub scale: i64,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_scale() -> i64 {
    DEFAULT_SCALE
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            scale: default_scale(),
        }
    }
}

impl LedgerConfig {
    /// Load from an optional `ledger.{toml,yaml,json}` file, overridden by
    /// `LEDGER_*` environment variables (e.g. `LEDGER_CURRENCY=USD`).
    pub fn load() -> LedgerResult<Self> {
        Self::load_from("ledger")
    }

    /// Same layering as [`load`](Self::load), reading the optional file `name`
    pub fn load_from(name: &str) -> LedgerResult<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        let code = self.currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::validation(format!(
                "Currency must be a three-letter code, got '{}'",
                self.currency
            )));
        }

        if !(0..=4).contains(&self.scale) {
            return Err(LedgerError::validation(format!(
                "Monetary scale must be between 0 and 4, got {}",
                self.scale
            )));
        }

        Ok(())
    }
}
