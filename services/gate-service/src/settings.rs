use anyhow::{Context, Result};
use std::net::SocketAddr;
use tg_api_types::GatingConfig;
use tg_gate_core::{ConfigStore, parse_flag};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// (environment variable, `ConfigStore::set_field` key)
const GATING_VARS: [(&str, &str); 5] = [
    ("TOKENGATE_ENABLED", "enabled"),
    ("TOKENGATE_CHAIN", "chain"),
    ("TOKENGATE_TOKEN_ADDRESS", "tokenAddress"),
    ("TOKENGATE_REQUIRED_AMOUNT", "requiredAmount"),
    ("TOKENGATE_TOKEN_NAME", "tokenDisplayName"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub gating: GatingConfig,
    pub wallet_switch: bool,
}

impl ServiceConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("TOKENGATE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned())
            .parse::<SocketAddr>()
            .context("TOKENGATE_BIND_ADDR must be a socket address")?;

        let store = ConfigStore::default();
        for (var, field) in GATING_VARS {
            if let Some(value) = lookup(var) {
                store
                    .set_field(field, &value)
                    .with_context(|| format!("invalid {var}"))?;
            }
        }

        let wallet_switch = match lookup("TOKENGATE_WALLET_SWITCH") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("invalid TOKENGATE_WALLET_SWITCH '{value}'"))?,
            None => true,
        };

        Ok(Self {
            bind_addr,
            gating: store.get(),
            wallet_switch,
        })
    }
}
