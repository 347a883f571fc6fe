pub use alloy::primitives::{Address, U256};

use async_trait::async_trait;
use tg_api_types::{ChainInfo, ChainKey, TokenAddress, WalletAddress};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub id: ChainKey,
    pub chain_id: u64,
    pub default_rpc_url: &'static str,
    pub testnet: bool,
}

impl ChainDescriptor {
    pub fn name(&self) -> &'static str {
        self.id.display_name()
    }

    pub fn info(&self) -> ChainInfo {
        ChainInfo {
            key: self.id,
            name: self.name().to_owned(),
            chain_id: self.chain_id,
            default_rpc_url: self.default_rpc_url.to_owned(),
            testnet: self.testnet,
        }
    }
}

const BUILTIN_CHAINS: [ChainDescriptor; 11] = [
    ChainDescriptor {
        id: ChainKey::Ethereum,
        chain_id: 1,
        default_rpc_url: "https://rpc.ankr.com/eth",
        testnet: false,
    },
    ChainDescriptor {
        id: ChainKey::Base,
        chain_id: 8453,
        default_rpc_url: "https://base-mainnet.public.blastapi.io",
        testnet: false,
    },
    ChainDescriptor {
        id: ChainKey::Polygon,
        chain_id: 137,
        default_rpc_url: "https://rpc.ankr.com/polygon",
        testnet: false,
    },
    ChainDescriptor {
        id: ChainKey::Arbitrum,
        chain_id: 42161,
        default_rpc_url: "https://rpc.ankr.com/arbitrum",
        testnet: false,
    },
    ChainDescriptor {
        id: ChainKey::Optimism,
        chain_id: 10,
        default_rpc_url: "https://rpc.ankr.com/optimism",
        testnet: false,
    },
    ChainDescriptor {
        id: ChainKey::Goerli,
        chain_id: 5,
        default_rpc_url: "https://rpc.ankr.com/eth_goerli",
        testnet: true,
    },
    ChainDescriptor {
        id: ChainKey::Sepolia,
        chain_id: 11_155_111,
        default_rpc_url: "https://rpc.ankr.com/eth_sepolia",
        testnet: true,
    },
    ChainDescriptor {
        id: ChainKey::PolygonMumbai,
        chain_id: 80001,
        default_rpc_url: "https://rpc.ankr.com/polygon_mumbai",
        testnet: true,
    },
    ChainDescriptor {
        id: ChainKey::OptimismGoerli,
        chain_id: 420,
        default_rpc_url: "https://rpc.ankr.com/optimism_testnet",
        testnet: true,
    },
    ChainDescriptor {
        id: ChainKey::ArbitrumSepolia,
        chain_id: 421_614,
        default_rpc_url: "https://sepolia-rollup.arbitrum.io/rpc",
        testnet: true,
    },
    ChainDescriptor {
        id: ChainKey::BaseSepolia,
        chain_id: 84532,
        default_rpc_url: "https://sepolia.base.org",
        testnet: true,
    },
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("unsupported chain: {0}")]
    Unsupported(ChainKey),
}

/// Failure of a single read against a token contract.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),
    #[error("contract call reverted: {0}")]
    ContractCallReverted(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl TokenError {
    /// Only transport-level failures are worth retrying; a revert or a bad
    /// address will fail the same way next time.
    pub fn is_transient(&self) -> bool {
        matches!(self, TokenError::RpcUnavailable(_))
    }
}

/// Loose validation: `0x` prefix plus 40 hex digits, any letter case.
/// Checksums are not enforced.
pub fn parse_address(input: &str) -> Result<Address, TokenError> {
    let trimmed = input.trim();
    let Some(digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    else {
        return Err(TokenError::InvalidAddress(format!("missing 0x prefix: '{trimmed}'")));
    };

    digits
        .parse::<Address>()
        .map_err(|err| TokenError::InvalidAddress(format!("'{trimmed}': {err}")))
}

pub fn parse_wallet_address(address: &WalletAddress) -> Result<Address, TokenError> {
    parse_address(&address.0)
}

pub fn parse_token_address(address: &TokenAddress) -> Result<Address, TokenError> {
    parse_address(&address.0)
}

/// Read-only access to a fungible token contract on some chain.
#[async_trait]
pub trait TokenReader: Send + Sync {
    fn source_name(&self) -> &str;
    async fn balance_of(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
        wallet: &WalletAddress,
    ) -> Result<U256, TokenError>;
    async fn decimals(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<u8, TokenError>;
    async fn symbol(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<String, TokenError>;
    async fn name(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<String, TokenError>;
    /// Contract-existence check: does the address carry deployed code?
    async fn has_code(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<bool, TokenError>;
}

#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChainRegistry {
    pub fn builtin() -> Self {
        Self {
            chains: BUILTIN_CHAINS.to_vec(),
        }
    }

    /// Unknown keys are an error, never a silent default to another chain.
    pub fn describe(&self, key: ChainKey) -> Result<&ChainDescriptor, ChainError> {
        self.chains
            .iter()
            .find(|chain| chain.id == key)
            .ok_or(ChainError::Unsupported(key))
    }

    pub fn by_chain_id(&self, chain_id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|chain| chain.chain_id == chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }

    pub fn chain_infos(&self) -> Vec<ChainInfo> {
        self.chains.iter().map(ChainDescriptor::info).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_table_has_canonical_ids() {
        let registry = ChainRegistry::builtin();
        let expected = [
            (ChainKey::Ethereum, 1),
            (ChainKey::Base, 8453),
            (ChainKey::Polygon, 137),
            (ChainKey::Arbitrum, 42161),
            (ChainKey::Optimism, 10),
            (ChainKey::Goerli, 5),
            (ChainKey::Sepolia, 11_155_111),
            (ChainKey::PolygonMumbai, 80001),
            (ChainKey::OptimismGoerli, 420),
            (ChainKey::ArbitrumSepolia, 421_614),
            (ChainKey::BaseSepolia, 84532),
        ];
        for (key, chain_id) in expected {
            assert_eq!(registry.describe(key).map(|c| c.chain_id), Ok(chain_id), "{key}");
        }
    }

    #[test]
    fn builtin_table_keys_and_ids_are_unique() {
        let registry = ChainRegistry::builtin();
        let keys: HashSet<_> = registry.iter().map(|c| c.id).collect();
        let ids: HashSet<_> = registry.iter().map(|c| c.chain_id).collect();
        assert_eq!(keys.len(), registry.iter().count());
        assert_eq!(ids.len(), registry.iter().count());
    }

    #[test]
    fn solana_is_unsupported() {
        let registry = ChainRegistry::builtin();
        assert_eq!(
            registry.describe(ChainKey::Solana),
            Err(ChainError::Unsupported(ChainKey::Solana))
        );
    }

    #[test]
    fn reverse_lookup_by_numeric_id() {
        let registry = ChainRegistry::builtin();
        assert_eq!(registry.by_chain_id(137).map(|c| c.id), Some(ChainKey::Polygon));
        assert!(registry.by_chain_id(56).is_none());
    }

    #[test]
    fn address_parsing_is_loose_about_case() -> Result<(), TokenError> {
        let mixed = parse_address("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")?;
        let lower = parse_address(" 0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48 ")?;
        let upper = parse_address("0XA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48")?;
        assert_eq!(mixed, lower);
        assert_eq!(mixed, upper);
        Ok(())
    }

    #[test]
    fn address_parsing_rejects_malformed_input() {
        let inputs = [
            "",
            "0x",
            "a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "0x1234",
            "0xzz86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        ];
        for input in inputs {
            let result = parse_address(input);
            assert!(matches!(result, Err(TokenError::InvalidAddress(_))), "{input}");
        }
    }

    #[test]
    fn wallet_and_token_newtypes_parse_alike() -> Result<(), TokenError> {
        let raw = "0x1111111111111111111111111111111111111111";
        let wallet = parse_wallet_address(&WalletAddress(raw.to_owned()))?;
        let token = parse_token_address(&TokenAddress(raw.to_owned()))?;
        assert_eq!(wallet, token);
        assert_eq!(wallet, Address::repeat_byte(0x11));
        Ok(())
    }

    #[test]
    fn only_rpc_unavailable_is_transient() {
        assert!(TokenError::RpcUnavailable("timeout".into()).is_transient());
        assert!(!TokenError::ContractCallReverted("revert".into()).is_transient());
        assert!(!TokenError::InvalidAddress("0x".into()).is_transient());
    }
}
