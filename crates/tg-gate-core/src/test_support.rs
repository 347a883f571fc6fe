use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tg_api_types::{ChainKey, TokenAddress, WalletAddress};
use tg_chain_client::{ChainDescriptor, ChainRegistry, TokenError, TokenReader, U256};

pub(crate) const TOKEN: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub(crate) const WALLET: &str = "0x1111111111111111111111111111111111111111";

pub(crate) fn ethereum() -> ChainDescriptor {
    ChainRegistry::builtin()
        .describe(ChainKey::Ethereum)
        .cloned()
        .expect("ethereum is builtin")
}

pub(crate) fn token() -> TokenAddress {
    TokenAddress(TOKEN.to_owned())
}

pub(crate) fn wallet() -> WalletAddress {
    WalletAddress(WALLET.to_owned())
}

/// Canned token contract. The balance can be changed between reads.
pub(crate) struct StaticReader {
    balance: Mutex<Result<U256, TokenError>>,
    decimals: Result<u8, TokenError>,
    symbol: Result<String, TokenError>,
    name: Result<String, TokenError>,
    code: Result<bool, TokenError>,
    balance_reads: AtomicUsize,
    delay: Duration,
}

impl StaticReader {
    pub(crate) fn new(balance: u64, decimals: u8, symbol: &str) -> Self {
        Self {
            balance: Mutex::new(Ok(U256::from(balance))),
            decimals: Ok(decimals),
            symbol: Ok(symbol.to_owned()),
            name: Ok(format!("{symbol} Token")),
            code: Ok(true),
            balance_reads: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn failing_balance(self, err: TokenError) -> Self {
        *self.balance.lock().expect("balance lock") = Err(err);
        self
    }

    pub(crate) fn failing_decimals(mut self, err: TokenError) -> Self {
        self.decimals = Err(err);
        self
    }

    pub(crate) fn failing_symbol(mut self, err: TokenError) -> Self {
        self.symbol = Err(err);
        self
    }

    pub(crate) fn failing_name(mut self, err: TokenError) -> Self {
        self.name = Err(err);
        self
    }

    pub(crate) fn failing_code(mut self, err: TokenError) -> Self {
        self.code = Err(err);
        self
    }

    pub(crate) fn without_code(mut self) -> Self {
        self.code = Ok(false);
        self
    }

    /// Every balance read takes `delay` of tokio time.
    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn set_balance(&self, balance: Result<u64, TokenError>) {
        *self.balance.lock().expect("balance lock") = balance.map(U256::from);
    }

    pub(crate) fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenReader for StaticReader {
    fn source_name(&self) -> &str {
        "static"
    }

    async fn balance_of(
        &self,
        _chain: &ChainDescriptor,
        _token: &TokenAddress,
        _wallet: &WalletAddress,
    ) -> Result<U256, TokenError> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.balance.lock().expect("balance lock").clone()
    }

    async fn decimals(
        &self,
        _chain: &ChainDescriptor,
        _token: &TokenAddress,
    ) -> Result<u8, TokenError> {
        self.decimals.clone()
    }

    async fn symbol(
        &self,
        _chain: &ChainDescriptor,
        _token: &TokenAddress,
    ) -> Result<String, TokenError> {
        self.symbol.clone()
    }

    async fn name(
        &self,
        _chain: &ChainDescriptor,
        _token: &TokenAddress,
    ) -> Result<String, TokenError> {
        self.name.clone()
    }

    async fn has_code(
        &self,
        _chain: &ChainDescriptor,
        _token: &TokenAddress,
    ) -> Result<bool, TokenError> {
        self.code.clone()
    }
}
