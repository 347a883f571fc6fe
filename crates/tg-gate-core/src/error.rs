use tg_api_types::ChainKey;
use tg_chain_client::TokenError;
use thiserror::Error;

/// Everything that can keep a visitor on the blocking screen.
///
/// None of these is fatal to the application; the worst case is a widget
/// parked in `Denied` or one of the recoverable states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("{} is not supported for token verification", .0.display_name())]
    UnsupportedChain(ChainKey),
    #[error("wrong network: expected chain ID {expected}, wallet is on chain ID {connected}")]
    WrongNetwork { expected: u64, connected: u64 },
    #[error("wallet cannot switch networks; switch to chain ID {0} manually")]
    SwitchUnavailable(u64),
    #[error("network switch request failed: {0}")]
    SwitchFailed(String),
    #[error("invalid or nonexistent token contract: {0}")]
    InvalidOrNonexistentContract(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),
    #[error(
        "insufficient tokens: balance {balance}, required {required}. \
         Wallet will be disconnected."
    )]
    InsufficientBalance { balance: String, required: String },
    #[error("cannot interpret token amount: {0}")]
    BalanceFormatting(String),
}

impl GateError {
    /// Leads to the punitive disconnect rather than a retry.
    pub fn is_punitive(&self) -> bool {
        matches!(
            self,
            GateError::InsufficientBalance { .. }
                | GateError::InvalidOrNonexistentContract(_)
                | GateError::InvalidAddress(_)
        )
    }
}

impl From<TokenError> for GateError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::RpcUnavailable(message) => GateError::RpcUnavailable(message),
            TokenError::ContractCallReverted(message) => {
                GateError::InvalidOrNonexistentContract(message)
            }
            TokenError::InvalidAddress(message) => GateError::InvalidAddress(message),
        }
    }
}
