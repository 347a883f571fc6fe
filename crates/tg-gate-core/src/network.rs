use tg_chain_client::ChainDescriptor;
use tracing::{info, warn};

use crate::wallet::WalletProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Handed to the wallet; the chain-changed event decides what happens next.
    Requested,
    /// The wallet has no switch capability; the user must switch by hand.
    Unavailable,
    Failed(String),
}

pub fn is_on_expected_chain(connected_chain_id: Option<u64>, expected: &ChainDescriptor) -> bool {
    connected_chain_id == Some(expected.chain_id)
}

/// Fire-and-forget switch request. Never changes gate state by itself.
pub async fn request_switch(
    wallet: &dyn WalletProvider,
    expected: &ChainDescriptor,
) -> SwitchOutcome {
    if !wallet.supports_switch() {
        return SwitchOutcome::Unavailable;
    }

    match wallet.request_switch(expected.chain_id).await {
        Ok(()) => {
            info!(chain = %expected.id, chain_id = expected.chain_id, "network switch requested");
            SwitchOutcome::Requested
        }
        Err(err) => {
            warn!(chain = %expected.id, "network switch request failed: {err:#}");
            SwitchOutcome::Failed(err.to_string())
        }
    }
}
