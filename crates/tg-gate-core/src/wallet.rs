use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tg_api_types::{WalletAddress, WalletRequest};
use tokio::sync::Mutex;
use tracing::debug;

/// State changes reported by the wallet-connection collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connected { address: WalletAddress, chain_id: u64 },
    ChainChanged(u64),
    Disconnected,
}

/// Requests the gate may issue to the wallet. The wallet, not the gate,
/// owns any approval UI.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn supports_switch(&self) -> bool;
    async fn request_switch(&self, chain_id: u64) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    /// Drops requests issued for an earlier connection that the wallet has
    /// not acted on yet.
    async fn discard_pending(&self) {}
}

/// Queues requests for a remote shim (the browser side) to drain and execute.
///
/// At most one request of each kind is queued; a newer switch target
/// replaces an older one.
pub struct RelayWallet {
    supports_switch: bool,
    pending: Mutex<Vec<WalletRequest>>,
}

impl RelayWallet {
    pub fn new(supports_switch: bool) -> Self {
        Self {
            supports_switch,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub async fn drain(&self) -> Vec<WalletRequest> {
        let mut guard = self.pending.lock().await;
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl WalletProvider for RelayWallet {
    fn supports_switch(&self) -> bool {
        self.supports_switch
    }

    async fn request_switch(&self, chain_id: u64) -> Result<()> {
        if !self.supports_switch {
            return Err(anyhow!("wallet does not support network switching"));
        }
        let mut guard = self.pending.lock().await;
        guard.retain(|request| !matches!(request, WalletRequest::SwitchChain { .. }));
        guard.push(WalletRequest::SwitchChain { chain_id });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut guard = self.pending.lock().await;
        if !guard.contains(&WalletRequest::Disconnect) {
            guard.push(WalletRequest::Disconnect);
        }
        Ok(())
    }

    async fn discard_pending(&self) {
        let mut guard = self.pending.lock().await;
        if !guard.is_empty() {
            debug!(dropped = guard.len(), "stale wallet requests discarded");
            guard.clear();
        }
    }
}
