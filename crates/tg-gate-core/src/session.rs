//! Verification State Machine.
//!
//! `VerificationSession` is a pure transition function: it consumes
//! [`SessionEvent`]s and answers with [`SessionCommand`]s for the runtime to
//! execute. It never touches the network, the wallet or the clock itself.
//!
//! ```text
//! Disconnected -> Initializing -> UnsupportedChain
//!                              -> ContractInvalid --verify--> Checking
//!                              -> WrongNetwork   --switch--> Checking
//!                              -> Checking -> Verified
//!                                          -> Denied --3s--> Disconnected
//! ```

use std::time::Duration;
use tg_api_types::{
    GatingConfig, ReadDiagnostics, SessionView, TokenAddress, TokenSnapshot, VerificationState,
    WalletAddress,
};
use tg_chain_client::{ChainDescriptor, ChainRegistry, TokenError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::amount::{AmountError, TokenAmount};
use crate::error::GateError;
use crate::network::is_on_expected_chain;
use crate::reader::TokenRead;

pub const SETTLE_DELAY: Duration = Duration::from_secs(1);
pub const DENIED_DISCONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Wait after connecting before the first chain read, so the wallet's
    /// own connection state has propagated.
    pub settle_delay: Duration,
    /// Delay between `Denied` and the forced disconnect.
    pub disconnect_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            disconnect_delay: DENIED_DISCONNECT_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SettleElapsed,
    ContractChecked(Result<bool, TokenError>),
    TokenRead {
        attempt: u32,
        result: Result<TokenRead, TokenError>,
    },
    ChainChanged(u64),
    SwitchRequested,
    SwitchUnavailable,
    SwitchFailed(String),
    VerifyRequested,
    RetryRequested,
    CloseRequested,
    DisconnectTimerFired,
    WalletDisconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ScheduleSettle(Duration),
    CheckContract {
        chain: ChainDescriptor,
        token: TokenAddress,
    },
    ReadToken {
        attempt: u32,
        chain: ChainDescriptor,
        token: TokenAddress,
        wallet: WalletAddress,
        display_name: String,
    },
    RequestSwitch(ChainDescriptor),
    ScheduleDisconnect(Duration),
    CancelDisconnect,
    ForceDisconnect,
    /// `onVerificationComplete`; emitted at most once per session.
    Complete,
    /// `onClose`.
    Dismiss,
}

#[derive(Debug)]
pub struct VerificationSession {
    id: Uuid,
    config: GatingConfig,
    expected: Option<ChainDescriptor>,
    required: Result<TokenAmount, AmountError>,
    timings: SessionTimings,
    state: VerificationState,
    wallet_address: WalletAddress,
    current_chain_id: Option<u64>,
    contract_is_valid: Option<bool>,
    snapshot: Option<TokenSnapshot>,
    diagnostics: ReadDiagnostics,
    has_required_tokens: bool,
    attempted: bool,
    attempt: u32,
    read_in_flight: bool,
    disconnect_pending: bool,
    completed: bool,
    error: Option<GateError>,
}

impl VerificationSession {
    /// Starts a session for a freshly connected wallet. The gating config is
    /// captured here; later edits only affect the next session.
    pub fn start(
        config: GatingConfig,
        registry: &ChainRegistry,
        wallet_address: WalletAddress,
        chain_id: u64,
        timings: SessionTimings,
    ) -> (Self, Vec<SessionCommand>) {
        let expected = registry.describe(config.chain).ok().cloned();
        let required = config.required_amount.parse::<TokenAmount>();
        let session = Self {
            id: Uuid::new_v4(),
            config,
            expected,
            required,
            timings,
            state: VerificationState::Initializing,
            wallet_address,
            current_chain_id: Some(chain_id),
            contract_is_valid: None,
            snapshot: None,
            diagnostics: ReadDiagnostics::default(),
            has_required_tokens: false,
            attempted: false,
            attempt: 0,
            read_in_flight: false,
            disconnect_pending: false,
            completed: false,
            error: None,
        };
        info!(
            session = %session.id,
            chain = %session.config.chain,
            wallet = %session.wallet_address.0,
            chain_id,
            "verification session started"
        );
        let settle = session.timings.settle_delay;
        (session, vec![SessionCommand::ScheduleSettle(settle)])
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> VerificationState {
        self.state
    }

    pub fn has_required_tokens(&self) -> bool {
        self.has_required_tokens
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn snapshot(&self) -> Option<&TokenSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&GateError> {
        self.error.as_ref()
    }

    pub fn disconnect_pending(&self) -> bool {
        self.disconnect_pending
    }

    pub fn is_connected(&self) -> bool {
        self.state != VerificationState::Disconnected
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionCommand> {
        use SessionEvent as E;
        use VerificationState as S;

        if matches!(event, E::WalletDisconnected) {
            return self.teardown();
        }
        if self.state.is_terminal() || self.state == S::Disconnected {
            debug!(
                session = %self.id,
                state = ?self.state,
                ?event,
                "event after session end ignored"
            );
            return Vec::new();
        }

        match (self.state, event) {
            (_, E::CloseRequested) => self.dismiss(),
            (_, E::ChainChanged(chain_id)) => self.on_chain_changed(chain_id),
            (S::Initializing, E::SettleElapsed) => self.after_settle(),
            (S::Initializing, E::ContractChecked(result)) => self.after_contract_check(result),
            (S::WrongNetwork, E::SwitchRequested) => self
                .expected
                .clone()
                .map(|chain| vec![SessionCommand::RequestSwitch(chain)])
                .unwrap_or_default(),
            (S::WrongNetwork, E::SwitchUnavailable) => {
                if let Some(chain) = &self.expected {
                    self.error = Some(GateError::SwitchUnavailable(chain.chain_id));
                }
                Vec::new()
            }
            (S::WrongNetwork, E::SwitchFailed(message)) => {
                self.error = Some(GateError::SwitchFailed(message));
                Vec::new()
            }
            (S::ContractInvalid, E::VerifyRequested) => self.proceed_to_check(),
            (S::Checking, E::TokenRead { attempt, result }) => self.after_read(attempt, result),
            (S::Checking, E::VerifyRequested) => self.confirm(),
            (S::Checking, E::RetryRequested) if !self.read_in_flight => self.begin_check(),
            (S::Denied, E::DisconnectTimerFired) => self.force_disconnect(),
            (state, event) => {
                debug!(session = %self.id, ?state, ?event, "event ignored in current state");
                Vec::new()
            }
        }
    }

    pub fn view(&self, registry: &ChainRegistry) -> SessionView {
        SessionView {
            session_id: self.id,
            state: self.state,
            chain: self.config.chain,
            chain_name: self.config.chain.display_name().to_owned(),
            expected_chain_id: self.expected.as_ref().map(|chain| chain.chain_id),
            wallet_address: self
                .is_connected()
                .then(|| self.wallet_address.0.clone()),
            current_chain_id: self.current_chain_id,
            current_chain_name: self
                .current_chain_id
                .and_then(|id| registry.by_chain_id(id))
                .map(|chain| chain.name().to_owned()),
            contract_is_valid: self.contract_is_valid,
            snapshot: self.snapshot.clone(),
            required_amount: self.config.required_amount.clone(),
            token_display_name: self.config.token_display_name.clone(),
            has_required_tokens: self.has_required_tokens,
            attempted: self.attempted,
            disconnect_pending: self.disconnect_pending,
            error: self.error.as_ref().map(ToString::to_string),
            diagnostics: self.diagnostics.clone(),
        }
    }

    fn after_settle(&mut self) -> Vec<SessionCommand> {
        let Some(chain) = self.expected.clone() else {
            self.error = Some(GateError::UnsupportedChain(self.config.chain));
            self.transition(VerificationState::UnsupportedChain);
            return Vec::new();
        };

        if self.config.token_address.trim().is_empty() {
            self.mark_contract_invalid(GateError::InvalidOrNonexistentContract(
                "no token contract configured".to_owned(),
            ));
            return Vec::new();
        }

        vec![SessionCommand::CheckContract {
            chain,
            token: TokenAddress(self.config.token_address.clone()),
        }]
    }

    fn after_contract_check(&mut self, result: Result<bool, TokenError>) -> Vec<SessionCommand> {
        match result {
            Ok(true) => {
                self.contract_is_valid = Some(true);
                self.proceed_to_check()
            }
            Ok(false) => {
                self.mark_contract_invalid(GateError::InvalidOrNonexistentContract(format!(
                    "no contract code at {}",
                    self.config.token_address
                )));
                Vec::new()
            }
            Err(err) => {
                self.mark_contract_invalid(GateError::from(err));
                Vec::new()
            }
        }
    }

    fn mark_contract_invalid(&mut self, error: GateError) {
        self.contract_is_valid = Some(false);
        self.error = Some(error);
        self.transition(VerificationState::ContractInvalid);
    }

    fn proceed_to_check(&mut self) -> Vec<SessionCommand> {
        let Some(expected) = &self.expected else {
            return Vec::new();
        };
        if is_on_expected_chain(self.current_chain_id, expected) {
            return self.begin_check();
        }

        self.error = Some(GateError::WrongNetwork {
            expected: expected.chain_id,
            connected: self.current_chain_id.unwrap_or_default(),
        });
        self.transition(VerificationState::WrongNetwork);
        Vec::new()
    }

    fn on_chain_changed(&mut self, chain_id: u64) -> Vec<SessionCommand> {
        self.current_chain_id = Some(chain_id);
        let Some(expected) = &self.expected else {
            return Vec::new();
        };
        let expected_id = expected.chain_id;
        let on_expected = is_on_expected_chain(self.current_chain_id, expected);

        match self.state {
            VerificationState::WrongNetwork if on_expected => self.begin_check(),
            VerificationState::WrongNetwork => {
                self.error = Some(GateError::WrongNetwork {
                    expected: expected_id,
                    connected: chain_id,
                });
                Vec::new()
            }
            VerificationState::Checking if !on_expected => {
                // Any read still in flight is for the old network.
                self.read_in_flight = false;
                self.attempt += 1;
                self.error = Some(GateError::WrongNetwork {
                    expected: expected_id,
                    connected: chain_id,
                });
                self.transition(VerificationState::WrongNetwork);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn begin_check(&mut self) -> Vec<SessionCommand> {
        let Some(chain) = self.expected.clone() else {
            return Vec::new();
        };
        self.attempt += 1;
        self.read_in_flight = true;
        self.error = None;
        self.transition(VerificationState::Checking);
        vec![SessionCommand::ReadToken {
            attempt: self.attempt,
            chain,
            token: TokenAddress(self.config.token_address.clone()),
            wallet: self.wallet_address.clone(),
            display_name: self.config.token_display_name.clone(),
        }]
    }

    fn after_read(
        &mut self,
        attempt: u32,
        result: Result<TokenRead, TokenError>,
    ) -> Vec<SessionCommand> {
        if attempt != self.attempt {
            debug!(
                session = %self.id,
                attempt,
                current = self.attempt,
                "stale token read discarded"
            );
            return Vec::new();
        }
        self.read_in_flight = false;
        self.attempted = true;

        let read = match result {
            Ok(read) => read,
            Err(err) => {
                self.snapshot = None;
                self.has_required_tokens = false;
                let error = GateError::from(err);
                if error.is_punitive() {
                    return self.deny(error);
                }
                self.error = Some(error);
                return Vec::new();
            }
        };

        self.snapshot = Some(read.snapshot.clone());
        self.diagnostics = read.diagnostics;

        let required = match &self.required {
            Ok(required) => required.clone(),
            Err(err) => {
                self.has_required_tokens = false;
                self.error = Some(GateError::BalanceFormatting(format!(
                    "required amount: {err}"
                )));
                return Vec::new();
            }
        };

        if read.balance >= required {
            self.has_required_tokens = true;
            self.verify()
        } else {
            self.has_required_tokens = false;
            self.deny(GateError::InsufficientBalance {
                balance: read.snapshot.formatted_balance,
                required: required.to_string(),
            })
        }
    }

    /// The explicit verify action only commits a balance already observed
    /// to be sufficient.
    fn confirm(&mut self) -> Vec<SessionCommand> {
        if self.has_required_tokens {
            return self.verify();
        }
        debug!(session = %self.id, "verify ignored: sufficient balance not observed");
        Vec::new()
    }

    fn verify(&mut self) -> Vec<SessionCommand> {
        if self.completed {
            return Vec::new();
        }
        self.completed = true;
        self.error = None;
        self.transition(VerificationState::Verified);
        vec![SessionCommand::Complete]
    }

    fn deny(&mut self, error: GateError) -> Vec<SessionCommand> {
        self.error = Some(error);
        self.disconnect_pending = true;
        self.transition(VerificationState::Denied);
        vec![SessionCommand::ScheduleDisconnect(self.timings.disconnect_delay)]
    }

    fn force_disconnect(&mut self) -> Vec<SessionCommand> {
        if !self.disconnect_pending {
            return Vec::new();
        }
        self.disconnect_pending = false;
        self.transition(VerificationState::Disconnected);
        vec![SessionCommand::ForceDisconnect]
    }

    fn dismiss(&mut self) -> Vec<SessionCommand> {
        let mut commands = Vec::new();
        if self.disconnect_pending {
            self.disconnect_pending = false;
            commands.push(SessionCommand::CancelDisconnect);
        }
        self.transition(VerificationState::Dismissed);
        commands.push(SessionCommand::Dismiss);
        commands
    }

    fn teardown(&mut self) -> Vec<SessionCommand> {
        self.read_in_flight = false;
        self.has_required_tokens = false;
        self.transition(VerificationState::Disconnected);
        if self.disconnect_pending {
            self.disconnect_pending = false;
            return vec![SessionCommand::CancelDisconnect];
        }
        Vec::new()
    }

    fn transition(&mut self, to: VerificationState) {
        if self.state != to {
            info!(session = %self.id, from = ?self.state, to = ?to, "verification state changed");
            self.state = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::format_units;
    use crate::test_support::{TOKEN, WALLET};
    use tg_api_types::ChainKey;
    use tg_chain_client::U256;

    fn config(chain: ChainKey, required: &str) -> GatingConfig {
        GatingConfig {
            enabled: true,
            chain,
            token_address: TOKEN.to_owned(),
            required_amount: required.to_owned(),
            token_display_name: "Token".to_owned(),
        }
    }

    fn start(config: GatingConfig, chain_id: u64) -> (VerificationSession, Vec<SessionCommand>) {
        VerificationSession::start(
            config,
            &ChainRegistry::builtin(),
            WalletAddress(WALLET.to_owned()),
            chain_id,
            SessionTimings::default(),
        )
    }

    fn read_of(raw: u128, decimals: u8) -> TokenRead {
        let raw = U256::from(raw);
        TokenRead {
            snapshot: TokenSnapshot {
                symbol: "USDC".to_owned(),
                name: Some("USD Coin".to_owned()),
                decimals,
                raw_balance: raw.to_string(),
                formatted_balance: format_units(raw, decimals),
            },
            balance: TokenAmount::from_raw(raw, decimals),
            diagnostics: ReadDiagnostics::default(),
        }
    }

    /// Drives a session on the expected chain to `Checking` and returns the
    /// attempt number of the outstanding read.
    fn checking(config: GatingConfig, chain_id: u64) -> (VerificationSession, u32) {
        let (mut session, _) = start(config, chain_id);
        assert!(matches!(
            session.handle(SessionEvent::SettleElapsed).as_slice(),
            [SessionCommand::CheckContract { .. }]
        ));
        let commands = session.handle(SessionEvent::ContractChecked(Ok(true)));
        let [SessionCommand::ReadToken { attempt, .. }] = commands.as_slice() else {
            panic!("expected a token read, got {commands:?}");
        };
        assert_eq!(session.state(), VerificationState::Checking);
        (session, *attempt)
    }

    #[test]
    fn connecting_schedules_the_settle_delay() {
        let (session, commands) = start(config(ChainKey::Ethereum, "1"), 1);
        assert_eq!(session.state(), VerificationState::Initializing);
        assert_eq!(commands, vec![SessionCommand::ScheduleSettle(Duration::from_secs(1))]);
    }

    #[test]
    fn half_a_token_is_denied_and_disconnect_scheduled() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);
        assert!(!session.attempted());

        let commands = session.handle(SessionEvent::TokenRead {
            attempt,
            result: Ok(read_of(500_000, 6)),
        });
        assert_eq!(commands, vec![SessionCommand::ScheduleDisconnect(Duration::from_secs(3))]);
        assert!(session.attempted());
        assert_eq!(session.state(), VerificationState::Denied);
        assert_eq!(session.snapshot().map(|s| s.formatted_balance.as_str()), Some("0.5"));
        assert!(matches!(session.error(), Some(GateError::InsufficientBalance { .. })));

        assert_eq!(
            session.handle(SessionEvent::DisconnectTimerFired),
            vec![SessionCommand::ForceDisconnect]
        );
        assert_eq!(session.state(), VerificationState::Disconnected);
    }

    #[test]
    fn two_tokens_verify_exactly_once() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);

        let commands = session.handle(SessionEvent::TokenRead {
            attempt,
            result: Ok(read_of(2_000_000, 6)),
        });
        assert_eq!(commands, vec![SessionCommand::Complete]);
        assert_eq!(session.state(), VerificationState::Verified);
        assert_eq!(session.snapshot().map(|s| s.formatted_balance.as_str()), Some("2"));

        assert!(session.handle(SessionEvent::VerifyRequested).is_empty());
        assert!(session.handle(SessionEvent::CloseRequested).is_empty());
    }

    #[test]
    fn verified_iff_balance_covers_requirement() {
        let cases: [(u128, u8, &str, bool); 8] = [
            (1_000_000_000_000_000_000, 18, "1.0", true),
            (999_999_999_999_999_999, 18, "1", false),
            (0, 18, "0", true),
            (0, 18, "0.000000000000000001", false),
            (1, 0, "1.000", true),
            (15, 1, "1.5", true),
            (14, 1, "1.5", false),
            (123_456_789, 6, "123.456789", true),
        ];

        for (raw, decimals, required, expect_verified) in cases {
            let (mut session, attempt) = checking(config(ChainKey::Ethereum, required), 1);
            session.handle(SessionEvent::TokenRead {
                attempt,
                result: Ok(read_of(raw, decimals)),
            });
            let verified = session.state() == VerificationState::Verified;
            assert_eq!(
                verified, expect_verified,
                "raw={raw} decimals={decimals} required={required}"
            );
        }
    }

    #[test]
    fn wrong_network_recovers_after_switch() {
        let (mut session, _) = start(config(ChainKey::Polygon, "1"), 1);
        session.handle(SessionEvent::SettleElapsed);
        assert!(session.handle(SessionEvent::ContractChecked(Ok(true))).is_empty());
        assert_eq!(session.state(), VerificationState::WrongNetwork);
        assert_eq!(
            session.error(),
            Some(&GateError::WrongNetwork {
                expected: 137,
                connected: 1
            })
        );

        let commands = session.handle(SessionEvent::SwitchRequested);
        assert!(matches!(
            commands.as_slice(),
            [SessionCommand::RequestSwitch(chain)] if chain.chain_id == 137
        ));
        assert_eq!(session.state(), VerificationState::WrongNetwork);

        let commands = session.handle(SessionEvent::ChainChanged(137));
        assert!(matches!(commands.as_slice(), [SessionCommand::ReadToken { .. }]));
        assert_eq!(session.state(), VerificationState::Checking);
    }

    #[test]
    fn missing_switch_capability_keeps_wrong_network() {
        let (mut session, _) = start(config(ChainKey::Polygon, "1"), 1);
        session.handle(SessionEvent::SettleElapsed);
        session.handle(SessionEvent::ContractChecked(Ok(true)));

        assert!(session.handle(SessionEvent::SwitchUnavailable).is_empty());
        assert_eq!(session.state(), VerificationState::WrongNetwork);
        assert_eq!(session.error(), Some(&GateError::SwitchUnavailable(137)));
    }

    #[test]
    fn leaving_the_chain_mid_check_discards_the_read() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);
        session.handle(SessionEvent::ChainChanged(10));
        assert_eq!(session.state(), VerificationState::WrongNetwork);

        assert!(session
            .handle(SessionEvent::TokenRead {
                attempt,
                result: Ok(read_of(2_000_000, 6)),
            })
            .is_empty());
        assert_eq!(session.state(), VerificationState::WrongNetwork);
    }

    #[test]
    fn unsupported_chain_never_reads() {
        let (mut session, _) = start(config(ChainKey::Solana, "1"), 1);
        assert!(session.handle(SessionEvent::SettleElapsed).is_empty());
        assert_eq!(session.state(), VerificationState::UnsupportedChain);
        assert_eq!(session.error(), Some(&GateError::UnsupportedChain(ChainKey::Solana)));
        assert!(session.handle(SessionEvent::VerifyRequested).is_empty());
    }

    #[test]
    fn invalid_contract_still_allows_a_manual_attempt() {
        let (mut session, _) = start(config(ChainKey::Ethereum, "1"), 1);
        session.handle(SessionEvent::SettleElapsed);
        assert!(session.handle(SessionEvent::ContractChecked(Ok(false))).is_empty());
        assert_eq!(session.state(), VerificationState::ContractInvalid);

        let commands = session.handle(SessionEvent::VerifyRequested);
        assert!(matches!(commands.as_slice(), [SessionCommand::ReadToken { .. }]));
        assert_eq!(session.state(), VerificationState::Checking);
    }

    #[test]
    fn blank_token_address_is_an_invalid_contract() {
        let mut blank = config(ChainKey::Ethereum, "1");
        blank.token_address = "  ".to_owned();
        let (mut session, _) = start(blank, 1);
        assert!(session.handle(SessionEvent::SettleElapsed).is_empty());
        assert_eq!(session.state(), VerificationState::ContractInvalid);
    }

    #[test]
    fn failed_contract_check_is_reported_as_invalid_contract() {
        let (mut session, _) = start(config(ChainKey::Ethereum, "1"), 1);
        session.handle(SessionEvent::SettleElapsed);
        session.handle(SessionEvent::ContractChecked(Err(TokenError::RpcUnavailable(
            "timeout".into(),
        ))));
        assert_eq!(session.state(), VerificationState::ContractInvalid);
        assert_eq!(session.view(&ChainRegistry::builtin()).contract_is_valid, Some(false));
    }

    #[test]
    fn transient_read_error_waits_for_retry() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);
        let commands = session.handle(SessionEvent::TokenRead {
            attempt,
            result: Err(TokenError::RpcUnavailable("timeout".into())),
        });
        assert!(commands.is_empty());
        assert_eq!(session.state(), VerificationState::Checking);
        assert!(!session.has_required_tokens());
        assert!(session.snapshot().is_none());

        let commands = session.handle(SessionEvent::RetryRequested);
        let [SessionCommand::ReadToken { attempt: retry, .. }] = commands.as_slice() else {
            panic!("expected a retry read, got {commands:?}");
        };
        assert_eq!(*retry, attempt + 1);

        // The first attempt answering late must not count.
        assert!(session
            .handle(SessionEvent::TokenRead {
                attempt,
                result: Ok(read_of(2_000_000, 6)),
            })
            .is_empty());
        assert_eq!(session.state(), VerificationState::Checking);
    }

    #[test]
    fn failed_read_is_never_a_zero_balance() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "0"), 1);
        session.handle(SessionEvent::TokenRead {
            attempt,
            result: Err(TokenError::ContractCallReverted("revert".into())),
        });
        assert_eq!(session.state(), VerificationState::Denied);
        assert!(session.disconnect_pending());
    }

    #[test]
    fn unparsable_requirement_surfaces_without_denying() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "lots"), 1);
        let commands = session.handle(SessionEvent::TokenRead {
            attempt,
            result: Ok(read_of(2_000_000, 6)),
        });
        assert!(commands.is_empty());
        assert_eq!(session.state(), VerificationState::Checking);
        assert!(matches!(session.error(), Some(GateError::BalanceFormatting(_))));
    }

    #[test]
    fn verify_is_refused_without_sufficient_balance() {
        let (mut session, _) = checking(config(ChainKey::Ethereum, "1"), 1);
        assert!(session.handle(SessionEvent::VerifyRequested).is_empty());
        assert_eq!(session.state(), VerificationState::Checking);
    }

    #[test]
    fn closing_cancels_the_pending_disconnect() {
        let (mut session, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);
        session.handle(SessionEvent::TokenRead {
            attempt,
            result: Ok(read_of(1, 6)),
        });
        assert!(session.disconnect_pending());

        assert_eq!(
            session.handle(SessionEvent::CloseRequested),
            vec![SessionCommand::CancelDisconnect, SessionCommand::Dismiss]
        );
        assert_eq!(session.state(), VerificationState::Dismissed);
        assert!(session.handle(SessionEvent::DisconnectTimerFired).is_empty());
    }

    #[test]
    fn disconnect_from_any_state_tears_down() {
        let (mut initializing, _) = start(config(ChainKey::Ethereum, "1"), 1);
        initializing.handle(SessionEvent::WalletDisconnected);
        assert_eq!(initializing.state(), VerificationState::Disconnected);

        let (mut denied, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);
        denied.handle(SessionEvent::TokenRead {
            attempt,
            result: Ok(read_of(0, 6)),
        });
        assert_eq!(
            denied.handle(SessionEvent::WalletDisconnected),
            vec![SessionCommand::CancelDisconnect]
        );
        assert_eq!(denied.state(), VerificationState::Disconnected);
        assert!(!denied.is_connected());

        let (mut verified, attempt) = checking(config(ChainKey::Ethereum, "1"), 1);
        verified.handle(SessionEvent::TokenRead {
            attempt,
            result: Ok(read_of(5_000_000, 6)),
        });
        verified.handle(SessionEvent::WalletDisconnected);
        assert_eq!(verified.state(), VerificationState::Disconnected);
        assert!(!verified.has_required_tokens());
    }

    #[test]
    fn view_names_both_networks() {
        let (mut session, _) = start(config(ChainKey::Polygon, "1"), 1);
        session.handle(SessionEvent::SettleElapsed);
        session.handle(SessionEvent::ContractChecked(Ok(true)));

        let view = session.view(&ChainRegistry::builtin());
        assert_eq!(view.chain_name, "Polygon");
        assert_eq!(view.expected_chain_id, Some(137));
        assert_eq!(view.current_chain_name.as_deref(), Some("Ethereum"));
        assert_eq!(view.state, VerificationState::WrongNetwork);
        assert!(view.error.is_some());
    }
}
