//! App Configuration Store.
//!
//! An explicitly passed, cloneable handle over a `watch` channel. Created at
//! startup, mutated by the settings surface, read by the gate runtime. Setters
//! only notify subscribers when a value actually changes.

use std::sync::Arc;
use tg_api_types::{ChainKey, ConfigUpdateRequest, GatingConfig};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown config field: {0}")]
    UnknownField(String),
    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<GatingConfig>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(GatingConfig::default())
    }
}

impl ConfigStore {
    pub fn new(initial: GatingConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> GatingConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GatingConfig> {
        self.tx.subscribe()
    }

    pub fn enabled(&self) -> bool {
        self.tx.borrow().enabled
    }

    pub fn chain(&self) -> ChainKey {
        self.tx.borrow().chain
    }

    pub fn token_address(&self) -> String {
        self.tx.borrow().token_address.clone()
    }

    pub fn required_amount(&self) -> String {
        self.tx.borrow().required_amount.clone()
    }

    pub fn token_display_name(&self) -> String {
        self.tx.borrow().token_display_name.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.modify(|config| replace(&mut config.enabled, enabled));
    }

    pub fn set_chain(&self, chain: ChainKey) {
        self.modify(|config| replace(&mut config.chain, chain));
    }

    pub fn set_token_address(&self, address: impl Into<String>) {
        let address = address.into().trim().to_owned();
        self.modify(|config| replace(&mut config.token_address, address));
    }

    pub fn set_required_amount(&self, amount: impl Into<String>) {
        let amount = amount.into().trim().to_owned();
        self.modify(|config| replace(&mut config.required_amount, amount));
    }

    pub fn set_token_display_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.modify(|config| replace(&mut config.token_display_name, name));
    }

    /// Applies every present field as one change notification.
    pub fn apply(&self, update: ConfigUpdateRequest) {
        self.modify(|config| {
            let mut changed = false;
            if let Some(enabled) = update.enabled {
                changed |= replace(&mut config.enabled, enabled);
            }
            if let Some(chain) = update.chain {
                changed |= replace(&mut config.chain, chain);
            }
            if let Some(address) = update.token_address {
                changed |= replace(&mut config.token_address, address.trim().to_owned());
            }
            if let Some(amount) = update.required_amount {
                changed |= replace(&mut config.required_amount, amount.trim().to_owned());
            }
            if let Some(name) = update.token_display_name {
                changed |= replace(&mut config.token_display_name, name);
            }
            changed
        });
    }

    /// String-typed setter for form inputs. Only coerces types; addresses
    /// and amounts are validated where they are used.
    pub fn set_field(&self, field: &str, value: &str) -> Result<(), ConfigError> {
        match field {
            "enabled" => {
                let enabled = parse_flag(value).ok_or_else(|| ConfigError::InvalidValue {
                    field: "enabled",
                    value: value.to_owned(),
                })?;
                self.set_enabled(enabled);
            }
            "chain" => {
                let chain = value.parse::<ChainKey>().map_err(|_| ConfigError::InvalidValue {
                    field: "chain",
                    value: value.to_owned(),
                })?;
                self.set_chain(chain);
            }
            "tokenAddress" => self.set_token_address(value),
            "requiredAmount" => self.set_required_amount(value),
            "tokenDisplayName" => self.set_token_display_name(value),
            other => return Err(ConfigError::UnknownField(other.to_owned())),
        }
        Ok(())
    }

    fn modify(&self, change: impl FnOnce(&mut GatingConfig) -> bool) {
        self.tx.send_if_modified(change);
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Loose boolean: `true`/`false`, `1`/`0`, `on`/`off`, `yes`/`no`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}
