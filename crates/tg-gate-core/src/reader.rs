//! Token Balance Reader.
//!
//! Folds the two fetch paths a wallet front end ends up with (the provider's
//! own read path and a direct public-RPC read) into one call. Both sources
//! are queried concurrently; `reconcile_balance` decides which balance wins.

use std::sync::Arc;
use tg_api_types::{ReadDiagnostics, TokenAddress, TokenSnapshot, ValueSource, WalletAddress};
use tg_chain_client::{ChainDescriptor, TokenError, TokenReader, U256};
use tracing::{debug, warn};

use crate::amount::TokenAmount;

pub const DEFAULT_DECIMALS: u8 = 18;

#[derive(Debug, Clone)]
pub struct TokenRead {
    pub snapshot: TokenSnapshot,
    pub balance: TokenAmount,
    pub diagnostics: ReadDiagnostics,
}

struct SourceRead {
    balance: Result<U256, TokenError>,
    decimals: Result<u8, TokenError>,
    symbol: Result<String, TokenError>,
    name: Result<String, TokenError>,
}

pub struct TokenBalanceReader {
    primary: Arc<dyn TokenReader>,
    fallback: Option<Arc<dyn TokenReader>>,
}

impl TokenBalanceReader {
    pub fn new(primary: Arc<dyn TokenReader>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn TokenReader>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Contract-existence check. The fallback is consulted only when the
    /// primary source cannot answer at all.
    pub async fn check_contract(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
    ) -> Result<bool, TokenError> {
        match self.primary.has_code(chain, token).await {
            Ok(found) => Ok(found),
            Err(err) if err.is_transient() => match &self.fallback {
                Some(fallback) => fallback.has_code(chain, token).await,
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    pub async fn read_token(
        &self,
        chain: &ChainDescriptor,
        token: &TokenAddress,
        wallet: &WalletAddress,
        display_name: &str,
    ) -> Result<TokenRead, TokenError> {
        let primary = read_source(self.primary.as_ref(), chain, token, wallet);
        let (primary, fallback) = match &self.fallback {
            Some(fallback) => {
                let (primary, fallback) =
                    tokio::join!(primary, read_source(fallback.as_ref(), chain, token, wallet));
                (primary, Some(fallback))
            }
            None => (primary.await, None),
        };

        let mut diagnostics = ReadDiagnostics {
            primary_balance: primary.balance.as_ref().ok().map(ToString::to_string),
            primary_error: primary.balance.as_ref().err().map(ToString::to_string),
            fallback_balance: fallback
                .as_ref()
                .and_then(|f| f.balance.as_ref().ok())
                .map(ToString::to_string),
            fallback_error: fallback
                .as_ref()
                .and_then(|f| f.balance.as_ref().err())
                .map(ToString::to_string),
            ..ReadDiagnostics::default()
        };

        let (raw, balance_source) =
            reconcile_balance(&primary.balance, fallback.as_ref().map(|f| &f.balance))?;
        diagnostics.balance_source = Some(balance_source);

        let fallback_decimals = fallback.as_ref().map(|f| &f.decimals);
        let (decimals, decimals_source) = match (&primary.decimals, fallback_decimals) {
            (Ok(decimals), _) => (*decimals, ValueSource::Primary),
            (Err(_), Some(Ok(decimals))) => (*decimals, ValueSource::Fallback),
            (Err(err), _) => {
                warn!(
                    chain = %chain.id,
                    token = %token.0,
                    "decimals read failed, assuming {DEFAULT_DECIMALS}: {err}"
                );
                (DEFAULT_DECIMALS, ValueSource::Default)
            }
        };
        diagnostics.decimals_source = Some(decimals_source);

        let non_empty = |text: &Result<String, TokenError>| {
            text.as_ref()
                .ok()
                .filter(|text| !text.trim().is_empty())
                .cloned()
        };
        let (symbol, symbol_source) = match (
            non_empty(&primary.symbol),
            fallback.as_ref().and_then(|f| non_empty(&f.symbol)),
        ) {
            (Some(symbol), _) => (symbol, ValueSource::Primary),
            (None, Some(symbol)) => (symbol, ValueSource::Fallback),
            (None, None) => {
                debug!(
                    chain = %chain.id,
                    token = %token.0,
                    "symbol unavailable, using display name"
                );
                (display_name.to_owned(), ValueSource::Default)
            }
        };
        diagnostics.symbol_source = Some(symbol_source);

        // Only a label; no placeholder when neither source has one.
        let name = non_empty(&primary.name)
            .or_else(|| fallback.as_ref().and_then(|f| non_empty(&f.name)));

        let balance = TokenAmount::from_raw(raw, decimals);
        Ok(TokenRead {
            snapshot: TokenSnapshot {
                symbol,
                name,
                decimals,
                raw_balance: raw.to_string(),
                formatted_balance: balance.to_string(),
            },
            balance,
            diagnostics,
        })
    }
}

async fn read_source(
    reader: &dyn TokenReader,
    chain: &ChainDescriptor,
    token: &TokenAddress,
    wallet: &WalletAddress,
) -> SourceRead {
    let (balance, decimals, symbol, name) = tokio::join!(
        reader.balance_of(chain, token, wallet),
        reader.decimals(chain, token),
        reader.symbol(chain, token),
        reader.name(chain, token),
    );
    if let Err(err) = &balance {
        debug!(source = reader.source_name(), "balance read failed: {err}");
    }
    SourceRead {
        balance,
        decimals,
        symbol,
        name,
    }
}

/// Primary wins when it reports a non-zero balance. A zero or failed primary
/// defers to a successful fallback, so a transient empty response cannot
/// mask a real balance. A failed read is never turned into zero.
pub fn reconcile_balance(
    primary: &Result<U256, TokenError>,
    fallback: Option<&Result<U256, TokenError>>,
) -> Result<(U256, ValueSource), TokenError> {
    match (primary, fallback) {
        (Ok(value), _) if !value.is_zero() => Ok((*value, ValueSource::Primary)),
        (_, Some(Ok(value))) => Ok((*value, ValueSource::Fallback)),
        (Ok(value), _) => Ok((*value, ValueSource::Primary)),
        (Err(err), _) => Err(err.clone()),
    }
}
