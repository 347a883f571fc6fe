pub mod amount;
pub mod config;
pub mod error;
pub mod gate;
pub mod network;
pub mod reader;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use amount::{AmountError, TokenAmount, format_units};
pub use config::{ConfigError, ConfigStore, parse_flag};
pub use error::GateError;
pub use gate::{GateController, decide};
pub use network::{SwitchOutcome, is_on_expected_chain, request_switch};
pub use reader::{DEFAULT_DECIMALS, TokenBalanceReader, TokenRead, reconcile_balance};
pub use runtime::{GateHandle, GateRuntime, RuntimeError, WidgetSignal};
pub use session::{SessionCommand, SessionEvent, SessionTimings, VerificationSession};
pub use timer::ScheduledTask;
pub use wallet::{RelayWallet, WalletEvent, WalletProvider};
