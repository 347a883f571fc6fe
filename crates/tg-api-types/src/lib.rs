use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Chains an operator can select for gating.
///
/// `Solana` is selectable but has no EVM descriptor; selecting it always
/// ends a session in `UnsupportedChain`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ChainKey {
    Ethereum,
    Base,
    Polygon,
    Arbitrum,
    Optimism,
    Goerli,
    Sepolia,
    PolygonMumbai,
    OptimismGoerli,
    ArbitrumSepolia,
    BaseSepolia,
    Solana,
}

impl ChainKey {
    pub const ALL: [ChainKey; 12] = [
        ChainKey::Ethereum,
        ChainKey::Base,
        ChainKey::Polygon,
        ChainKey::Arbitrum,
        ChainKey::Optimism,
        ChainKey::Goerli,
        ChainKey::Sepolia,
        ChainKey::PolygonMumbai,
        ChainKey::OptimismGoerli,
        ChainKey::ArbitrumSepolia,
        ChainKey::BaseSepolia,
        ChainKey::Solana,
    ];

    /// Wire name, identical to the serde representation.
    pub fn slug(self) -> &'static str {
        match self {
            ChainKey::Ethereum => "ethereum",
            ChainKey::Base => "base",
            ChainKey::Polygon => "polygon",
            ChainKey::Arbitrum => "arbitrum",
            ChainKey::Optimism => "optimism",
            ChainKey::Goerli => "goerli",
            ChainKey::Sepolia => "sepolia",
            ChainKey::PolygonMumbai => "polygonMumbai",
            ChainKey::OptimismGoerli => "optimismGoerli",
            ChainKey::ArbitrumSepolia => "arbitrumSepolia",
            ChainKey::BaseSepolia => "baseSepolia",
            ChainKey::Solana => "solana",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChainKey::Ethereum => "Ethereum",
            ChainKey::Base => "Base",
            ChainKey::Polygon => "Polygon",
            ChainKey::Arbitrum => "Arbitrum",
            ChainKey::Optimism => "Optimism",
            ChainKey::Goerli => "Goerli",
            ChainKey::Sepolia => "Sepolia",
            ChainKey::PolygonMumbai => "Polygon Mumbai",
            ChainKey::OptimismGoerli => "Optimism Goerli",
            ChainKey::ArbitrumSepolia => "Arbitrum Sepolia",
            ChainKey::BaseSepolia => "Base Sepolia",
            ChainKey::Solana => "Solana",
        }
    }
}

impl fmt::Display for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown chain: {0}")]
pub struct UnknownChainKey(pub String);

impl FromStr for ChainKey {
    type Err = UnknownChainKey;

    /// Accepts the wire slug case-insensitively (`polygonMumbai`, `POLYGONMUMBAI`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ChainKey::ALL
            .into_iter()
            .find(|key| key.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownChainKey(wanted.to_owned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletAddress(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAddress(pub String);

/// Session-scoped gating settings. Never persisted; resets to defaults on restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatingConfig {
    pub enabled: bool,
    pub chain: ChainKey,
    pub token_address: String,
    pub required_amount: String,
    pub token_display_name: String,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chain: ChainKey::Ethereum,
            token_address: String::new(),
            required_amount: "1".to_owned(),
            token_display_name: "Token".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    pub symbol: String,
    /// The contract's `name()`, when it answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub decimals: u8,
    pub raw_balance: String,
    pub formatted_balance: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Disconnected,
    Initializing,
    UnsupportedChain,
    WrongNetwork,
    ContractInvalid,
    Checking,
    Verified,
    Denied,
    Dismissed,
}

impl VerificationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, VerificationState::Verified | VerificationState::Dismissed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateView {
    ProtectedApp,
    BlockingScreen,
}

/// Which source produced a field of the snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Primary,
    Fallback,
    Default,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadDiagnostics {
    pub primary_balance: Option<String>,
    pub primary_error: Option<String>,
    pub fallback_balance: Option<String>,
    pub fallback_error: Option<String>,
    pub balance_source: Option<ValueSource>,
    pub decimals_source: Option<ValueSource>,
    pub symbol_source: Option<ValueSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: VerificationState,
    pub chain: ChainKey,
    pub chain_name: String,
    pub expected_chain_id: Option<u64>,
    pub wallet_address: Option<String>,
    pub current_chain_id: Option<u64>,
    pub current_chain_name: Option<String>,
    pub contract_is_valid: Option<bool>,
    pub snapshot: Option<TokenSnapshot>,
    pub required_amount: String,
    pub token_display_name: String,
    pub has_required_tokens: bool,
    pub attempted: bool,
    pub disconnect_pending: bool,
    pub error: Option<String>,
    pub diagnostics: ReadDiagnostics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateStatus {
    pub view: GateView,
    pub enabled: bool,
    pub connected: bool,
    pub verified: bool,
    pub widget_visible: bool,
    pub session: Option<SessionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainInfo {
    pub key: ChainKey,
    pub name: String,
    pub chain_id: u64,
    pub default_rpc_url: String,
    pub testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainListResponse {
    pub chains: Vec<ChainInfo>,
}

/// Partial update of [`GatingConfig`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    pub enabled: Option<bool>,
    pub chain: Option<ChainKey>,
    pub token_address: Option<String>,
    pub required_amount: Option<String>,
    pub token_display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConnectRequest {
    pub wallet_address: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletChainRequest {
    pub chain_id: u64,
}

/// Instruction for the browser-side wallet shim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalletRequest {
    SwitchChain { chain_id: u64 },
    Disconnect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRequestsResponse {
    pub requests: Vec<WalletRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_key_parses_wire_slug_case_insensitively() {
        assert_eq!("polygonMumbai".parse::<ChainKey>(), Ok(ChainKey::PolygonMumbai));
        assert_eq!(" ETHEREUM ".parse::<ChainKey>(), Ok(ChainKey::Ethereum));
        assert_eq!(
            "dogechain".parse::<ChainKey>().map_err(|err| err.to_string()),
            Err("unknown chain: dogechain".to_owned())
        );
    }

    #[test]
    fn chain_key_serde_matches_slug() {
        for key in ChainKey::ALL {
            let encoded = serde_json::to_string(&key).unwrap();
            assert_eq!(encoded, format!("\"{}\"", key.slug()));
        }
    }

    #[test]
    fn gating_config_defaults() {
        let config = GatingConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.chain, ChainKey::Ethereum);
        assert!(config.token_address.is_empty());
        assert_eq!(config.required_amount, "1");
        assert_eq!(config.token_display_name, "Token");
    }

    #[test]
    fn snapshot_omits_unknown_token_name() {
        let snapshot = TokenSnapshot {
            symbol: "USDC".to_owned(),
            name: None,
            decimals: 6,
            raw_balance: "500000".to_owned(),
            formatted_balance: "0.5".to_owned(),
        };
        let encoded = serde_json::to_value(&snapshot).unwrap();
        assert!(encoded.get("name").is_none());
        assert_eq!(encoded["formattedBalance"], "0.5");
    }

    #[test]
    fn wallet_request_is_tagged() {
        let encoded = serde_json::to_value(WalletRequest::SwitchChain { chain_id: 137 }).unwrap();
        assert_eq!(encoded["kind"], "switch_chain");
        assert_eq!(encoded["chain_id"], 137);
    }
}
