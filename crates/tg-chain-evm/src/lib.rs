mod erc20;

use alloy::primitives::U256;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::IntoFuture;
use std::time::Duration;
use tg_api_types::{ChainKey, TokenAddress, WalletAddress};
use tg_chain_client::{
    ChainDescriptor, TokenError, TokenReader, parse_token_address, parse_wallet_address,
};
use tracing::debug;

use crate::erc20::{
    IERC20, IERC20Bytes32, bytes32_text, classify_call_error, classify_transport_error,
};

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable overriding the RPC endpoint of one chain,
/// e.g. `TOKENGATE_RPC_POLYGONMUMBAI`.
pub fn endpoint_env_var(chain: ChainKey) -> String {
    format!("TOKENGATE_RPC_{}", chain.slug().to_ascii_uppercase())
}

#[derive(Debug, Clone, Copy)]
enum TextField {
    Symbol,
    Name,
}

impl TextField {
    fn call(self) -> &'static str {
        match self {
            TextField::Symbol => "symbol",
            TextField::Name => "name",
        }
    }
}

/// `TokenReader` over an alloy HTTP provider.
///
/// Each chain uses its registry default endpoint unless an override has
/// been registered with [`EvmRpcReader::with_endpoint`].
pub struct EvmRpcReader {
    name: String,
    timeout: Duration,
    endpoints: HashMap<ChainKey, String>,
}

impl EvmRpcReader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: DEFAULT_RPC_TIMEOUT,
            endpoints: HashMap::new(),
        }
    }

    /// Reads `TOKENGATE_RPC_<CHAIN>` for every chain at construction time.
    pub fn from_env(name: impl Into<String>) -> Self {
        let mut reader = Self::new(name);
        for chain in ChainKey::ALL {
            if let Ok(url) = std::env::var(endpoint_env_var(chain)) {
                if !url.trim().is_empty() {
                    reader = reader.with_endpoint(chain, url);
                }
            }
        }
        reader
    }

    pub fn with_endpoint(mut self, chain: ChainKey, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.endpoints
            .insert(chain, url.trim().trim_end_matches('/').to_owned());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_overrides(&self) -> bool {
        !self.endpoints.is_empty()
    }

    pub fn endpoint_for<'a>(&'a self, chain: &'a ChainDescriptor) -> &'a str {
        self.endpoints
            .get(&chain.id)
            .map(String::as_str)
            .unwrap_or(chain.default_rpc_url)
    }

    fn connect(&self, chain: &ChainDescriptor) -> Result<impl Provider, TokenError> {
        let endpoint = self.endpoint_for(chain);
        Ok(ProviderBuilder::new().connect_http(endpoint.parse().map_err(|e| {
            TokenError::RpcUnavailable(format!("invalid rpc url '{endpoint}': {e}"))
        })?))
    }

    /// Runs one provider request under the reader's timeout.
    async fn bounded<T, E>(
        &self,
        call: &str,
        request: impl IntoFuture<Output = Result<T, E>>,
        classify: fn(&str, E) -> TokenError,
    ) -> Result<T, TokenError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(|err| classify(call, err)),
            Err(_) => Err(TokenError::RpcUnavailable(format!(
                "{call}: no response within {:?}",
                self.timeout
            ))),
        }
    }

    /// `string` metadata, retried as `bytes32` when the standard read fails
    /// on the contract side.
    async fn read_text(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
        field: TextField,
    ) -> Result<String, TokenError> {
        let address = parse_token_address(token)?;
        let provider = self.connect(chain)?;
        let call = field.call();

        let erc20 = IERC20::new(address, &provider);
        let standard = match field {
            TextField::Symbol => {
                self.bounded(call, erc20.symbol().call(), classify_call_error)
                    .await
            }
            TextField::Name => {
                self.bounded(call, erc20.name().call(), classify_call_error)
                    .await
            }
        };
        let reason = match standard {
            Err(TokenError::ContractCallReverted(reason)) => reason,
            other => return other,
        };

        debug!(
            source = %self.name,
            chain = %chain.id,
            %address,
            call,
            %reason,
            "retrying as bytes32"
        );
        let legacy = IERC20Bytes32::new(address, &provider);
        let word = match field {
            TextField::Symbol => {
                self.bounded(call, legacy.symbol().call(), classify_call_error)
                    .await?
            }
            TextField::Name => {
                self.bounded(call, legacy.name().call(), classify_call_error)
                    .await?
            }
        };
        Ok(bytes32_text(word))
    }
}

#[async_trait]
impl TokenReader for EvmRpcReader {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn balance_of(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
        wallet: &WalletAddress,
    ) -> Result<U256, TokenError> {
        let token = parse_token_address(token)?;
        let wallet = parse_wallet_address(wallet)?;
        let provider = self.connect(chain)?;
        let erc20 = IERC20::new(token, &provider);

        let balance = self
            .bounded("balanceOf", erc20.balanceOf(wallet).call(), classify_call_error)
            .await?;
        debug!(source = %self.name, chain = %chain.id, %token, %wallet, %balance, "balanceOf");
        Ok(balance)
    }

    async fn decimals(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<u8, TokenError> {
        let token = parse_token_address(token)?;
        let provider = self.connect(chain)?;
        let erc20 = IERC20::new(token, &provider);
        self.bounded("decimals", erc20.decimals().call(), classify_call_error)
            .await
    }

    async fn symbol(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<String, TokenError> {
        self.read_text(chain, token, TextField::Symbol).await
    }

    async fn name(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<String, TokenError> {
        self.read_text(chain, token, TextField::Name).await
    }

    async fn has_code(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<bool, TokenError> {
        let token = parse_token_address(token)?;
        let provider = self.connect(chain)?;
        let code = self
            .bounded(
                "eth_getCode",
                provider.get_code_at(token),
                classify_transport_error,
            )
            .await?;
        Ok(!code.is_empty())
    }
}
