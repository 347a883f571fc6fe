//! The gate runtime: one task owning the [`GateController`] and the live
//! [`VerificationSession`].
//!
//! Wallet events, widget actions, config changes and the results of
//! background work all arrive as messages, so there is never more than one
//! writer. Background results carry the id of the session that asked for
//! them and are dropped if that session is gone.

use std::sync::Arc;
use std::time::Duration;
use tg_api_types::{GateStatus, GatingConfig, WalletAddress};
use tg_chain_client::ChainRegistry;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConfigStore;
use crate::gate::GateController;
use crate::network::{SwitchOutcome, request_switch};
use crate::reader::TokenBalanceReader;
use crate::session::{SessionCommand, SessionEvent, SessionTimings, VerificationSession};
use crate::timer::ScheduledTask;
use crate::wallet::{WalletEvent, WalletProvider};

/// Callbacks the widget raises towards its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetSignal {
    VerificationComplete { session_id: Uuid },
    Closed { session_id: Uuid },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("gate runtime has stopped")]
    Stopped,
}

#[derive(Debug)]
enum GateInput {
    Wallet(WalletEvent),
    Verify,
    SwitchNetwork,
    Retry,
    Close,
}

#[derive(Clone)]
pub struct GateHandle {
    inputs: mpsc::UnboundedSender<GateInput>,
    status: watch::Receiver<GateStatus>,
}

impl GateHandle {
    pub fn connect(&self, address: WalletAddress, chain_id: u64) -> Result<(), RuntimeError> {
        self.send(GateInput::Wallet(WalletEvent::Connected { address, chain_id }))
    }

    pub fn chain_changed(&self, chain_id: u64) -> Result<(), RuntimeError> {
        self.send(GateInput::Wallet(WalletEvent::ChainChanged(chain_id)))
    }

    pub fn disconnect(&self) -> Result<(), RuntimeError> {
        self.send(GateInput::Wallet(WalletEvent::Disconnected))
    }

    pub fn verify(&self) -> Result<(), RuntimeError> {
        self.send(GateInput::Verify)
    }

    pub fn switch_network(&self) -> Result<(), RuntimeError> {
        self.send(GateInput::SwitchNetwork)
    }

    pub fn retry(&self) -> Result<(), RuntimeError> {
        self.send(GateInput::Retry)
    }

    pub fn close(&self) -> Result<(), RuntimeError> {
        self.send(GateInput::Close)
    }

    pub fn status(&self) -> GateStatus {
        self.status.borrow().clone()
    }

    /// Resolves with the first published status matching `ready`.
    pub async fn wait_until(
        &self,
        mut ready: impl FnMut(&GateStatus) -> bool,
    ) -> Result<GateStatus, RuntimeError> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|status| ready(status))
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        Ok(status.clone())
    }

    fn send(&self, input: GateInput) -> Result<(), RuntimeError> {
        self.inputs.send(input).map_err(|_| RuntimeError::Stopped)
    }
}

pub struct GateRuntime {
    config: ConfigStore,
    registry: Arc<ChainRegistry>,
    reader: Arc<TokenBalanceReader>,
    wallet: Arc<dyn WalletProvider>,
    timings: SessionTimings,
    signals: Option<mpsc::UnboundedSender<WidgetSignal>>,
}

impl GateRuntime {
    pub fn new(
        config: ConfigStore,
        registry: Arc<ChainRegistry>,
        reader: Arc<TokenBalanceReader>,
        wallet: Arc<dyn WalletProvider>,
    ) -> Self {
        Self {
            config,
            registry,
            reader,
            wallet,
            timings: SessionTimings::default(),
            signals: None,
        }
    }

    pub fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_signals(mut self, signals: mpsc::UnboundedSender<WidgetSignal>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Spawns the runtime task. It stops once every [`GateHandle`] is dropped.
    pub fn spawn(self) -> GateHandle {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let enabled = self.config.enabled();
        let (status_tx, status_rx) = watch::channel(GateStatus {
            view: GateController::default().view(enabled),
            enabled,
            connected: false,
            verified: false,
            widget_visible: false,
            session: None,
        });

        let config_rx = self.config.subscribe();
        let actor = Actor {
            config: self.config,
            registry: self.registry,
            reader: self.reader,
            wallet: self.wallet,
            timings: self.timings,
            signals: self.signals,
            enabled,
            gate: GateController::default(),
            connection: None,
            session: None,
            settle_timer: None,
            disconnect_timer: None,
            internal_tx,
            status_tx,
        };
        tokio::spawn(actor.run(inputs_rx, internal_rx, config_rx));

        GateHandle {
            inputs: inputs_tx,
            status: status_rx,
        }
    }
}

struct Actor {
    config: ConfigStore,
    registry: Arc<ChainRegistry>,
    reader: Arc<TokenBalanceReader>,
    wallet: Arc<dyn WalletProvider>,
    timings: SessionTimings,
    signals: Option<mpsc::UnboundedSender<WidgetSignal>>,
    enabled: bool,
    gate: GateController,
    connection: Option<(WalletAddress, u64)>,
    session: Option<VerificationSession>,
    settle_timer: Option<ScheduledTask>,
    disconnect_timer: Option<ScheduledTask>,
    internal_tx: mpsc::UnboundedSender<(Uuid, SessionEvent)>,
    status_tx: watch::Sender<GateStatus>,
}

impl Actor {
    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<GateInput>,
        mut internal: mpsc::UnboundedReceiver<(Uuid, SessionEvent)>,
        mut config_rx: watch::Receiver<GatingConfig>,
    ) {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.on_input(input).await,
                    None => break,
                },
                Some((session_id, event)) = internal.recv() => {
                    self.on_internal(session_id, event).await;
                }
                Ok(()) = config_rx.changed() => self.on_config_changed().await,
            }
            self.publish();
        }
        debug!("gate runtime stopped");
    }

    async fn on_input(&mut self, input: GateInput) {
        match input {
            GateInput::Wallet(WalletEvent::Connected { address, chain_id }) => {
                if self.connection.is_some() {
                    self.end_session();
                    self.gate.on_disconnected();
                }
                info!(wallet = %address.0, chain_id, "wallet connected");
                // A punitive disconnect still queued for an earlier session
                // must not reach this one.
                self.wallet.discard_pending().await;
                self.connection = Some((address, chain_id));
                self.gate.on_connected(self.enabled);
                if self.gate.needs_verification(self.enabled) {
                    self.start_session().await;
                }
            }
            GateInput::Wallet(WalletEvent::ChainChanged(chain_id)) => {
                let Some((_, current)) = self.connection.as_mut() else {
                    debug!(chain_id, "chain change without a connected wallet ignored");
                    return;
                };
                *current = chain_id;
                self.dispatch(SessionEvent::ChainChanged(chain_id)).await;
            }
            GateInput::Wallet(WalletEvent::Disconnected) => {
                if self.connection.is_none() {
                    return;
                }
                self.dispatch(SessionEvent::WalletDisconnected).await;
                self.on_disconnected();
            }
            GateInput::Verify => self.dispatch(SessionEvent::VerifyRequested).await,
            GateInput::SwitchNetwork => self.dispatch(SessionEvent::SwitchRequested).await,
            GateInput::Retry => self.dispatch(SessionEvent::RetryRequested).await,
            GateInput::Close => self.dispatch(SessionEvent::CloseRequested).await,
        }
    }

    async fn on_internal(&mut self, session_id: Uuid, event: SessionEvent) {
        match &self.session {
            Some(session) if session.id() == session_id => self.dispatch(event).await,
            _ => debug!(session = %session_id, ?event, "result for an ended session discarded"),
        }
    }

    async fn on_config_changed(&mut self) {
        let enabled = self.config.enabled();
        if enabled == self.enabled {
            // Edits to chain, token or amount apply from the next session.
            return;
        }
        self.enabled = enabled;
        info!(enabled, "token gating toggled");
        self.gate.on_enabled_changed(enabled);

        if !enabled {
            self.end_session();
        } else if self.session.is_none() && self.gate.needs_verification(enabled) {
            self.start_session().await;
        }
    }

    async fn start_session(&mut self) {
        let Some((address, chain_id)) = self.connection.clone() else {
            return;
        };
        self.end_session();
        let (session, commands) = VerificationSession::start(
            self.config.get(),
            &self.registry,
            address,
            chain_id,
            self.timings,
        );
        self.session = Some(session);
        self.execute(commands).await;
    }

    fn end_session(&mut self) {
        self.settle_timer = None;
        self.disconnect_timer = None;
        if let Some(session) = self.session.take() {
            debug!(session = %session.id(), state = ?session.state(), "verification session ended");
        }
    }

    fn on_disconnected(&mut self) {
        info!("wallet disconnected");
        self.connection = None;
        self.end_session();
        self.gate.on_disconnected();
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let commands = session.handle(event);
        self.execute(commands).await;
    }

    async fn execute(&mut self, commands: Vec<SessionCommand>) {
        for command in commands {
            let Some(session_id) = self.session.as_ref().map(VerificationSession::id) else {
                return;
            };
            match command {
                SessionCommand::ScheduleSettle(delay) => {
                    let timer = self.schedule(session_id, delay, SessionEvent::SettleElapsed);
                    self.settle_timer = Some(timer);
                }
                SessionCommand::CheckContract { chain, token } => {
                    let reader = self.reader.clone();
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        let result = reader.check_contract(&chain, &token).await;
                        let _ = tx.send((session_id, SessionEvent::ContractChecked(result)));
                    });
                }
                SessionCommand::ReadToken {
                    attempt,
                    chain,
                    token,
                    wallet,
                    display_name,
                } => {
                    let reader = self.reader.clone();
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        let result = reader
                            .read_token(&chain, &token, &wallet, &display_name)
                            .await;
                        let _ = tx.send((session_id, SessionEvent::TokenRead { attempt, result }));
                    });
                }
                SessionCommand::RequestSwitch(chain) => {
                    let wallet = self.wallet.clone();
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        let event = match request_switch(wallet.as_ref(), &chain).await {
                            SwitchOutcome::Requested => return,
                            SwitchOutcome::Unavailable => SessionEvent::SwitchUnavailable,
                            SwitchOutcome::Failed(message) => SessionEvent::SwitchFailed(message),
                        };
                        let _ = tx.send((session_id, event));
                    });
                }
                SessionCommand::ScheduleDisconnect(delay) => {
                    info!(session = %session_id, ?delay, "wallet will be disconnected");
                    self.disconnect_timer =
                        Some(self.schedule(session_id, delay, SessionEvent::DisconnectTimerFired));
                }
                SessionCommand::CancelDisconnect => {
                    if let Some(timer) = self.disconnect_timer.take() {
                        timer.cancel();
                    }
                }
                SessionCommand::ForceDisconnect => {
                    if let Err(err) = self.wallet.disconnect().await {
                        warn!(session = %session_id, "wallet disconnect failed: {err:#}");
                    }
                    self.on_disconnected();
                }
                SessionCommand::Complete => {
                    info!(session = %session_id, "token ownership verified");
                    self.gate.on_verification_complete();
                    self.emit(WidgetSignal::VerificationComplete { session_id });
                    self.end_session();
                }
                SessionCommand::Dismiss => {
                    info!(session = %session_id, "verification widget closed");
                    self.gate.on_widget_closed();
                    self.emit(WidgetSignal::Closed { session_id });
                    self.end_session();
                }
            }
        }
    }

    fn schedule(&self, session_id: Uuid, delay: Duration, event: SessionEvent) -> ScheduledTask {
        let tx = self.internal_tx.clone();
        ScheduledTask::after(delay, async move {
            let _ = tx.send((session_id, event));
        })
    }

    fn emit(&self, signal: WidgetSignal) {
        let Some(signals) = &self.signals else {
            return;
        };
        if signals.send(signal).is_err() {
            debug!("widget signal receiver dropped");
        }
    }

    fn publish(&self) {
        let status = GateStatus {
            view: self.gate.view(self.enabled),
            enabled: self.enabled,
            connected: self.gate.connected(),
            verified: self.gate.verified(),
            widget_visible: self.gate.widget_visible(),
            session: self
                .session
                .as_ref()
                .map(|session| session.view(&self.registry)),
        };
        self.status_tx.send_replace(status);
    }
}
