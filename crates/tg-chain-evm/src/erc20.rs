//! ERC-20 read interfaces and the mapping of provider failures onto
//! [`TokenError`].

use alloy::contract::Error as ContractError;
use alloy::primitives::B256;
use alloy::sol;
use alloy::transports::{RpcError, TransportError};
use tg_chain_client::TokenError;

// JSON-RPC error code geth uses for `execution reverted`.
const EXECUTION_REVERTED: i64 = 3;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function name() external view returns (string);
    }

    // Pre-standard tokens (MKR, SAI) return fixed-size metadata.
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20Bytes32 {
        function symbol() external view returns (bytes32);
        function name() external view returns (bytes32);
    }
}

/// Empty or undecodable return data means the address did not answer like a
/// token, which is as final as a revert.
pub(crate) fn classify_call_error(call: &str, err: ContractError) -> TokenError {
    match err {
        ContractError::TransportError(err) => classify_transport_error(call, err),
        other => TokenError::ContractCallReverted(format!("{call}: {other}")),
    }
}

pub(crate) fn classify_transport_error(call: &str, err: TransportError) -> TokenError {
    match err {
        RpcError::ErrorResp(payload)
            if payload.code == EXECUTION_REVERTED || payload.message.contains("revert") =>
        {
            TokenError::ContractCallReverted(format!("{call}: {}", payload.message))
        }
        other => TokenError::RpcUnavailable(format!("{call}: {other}")),
    }
}

/// NUL-padded `bytes32` text.
pub(crate) fn bytes32_text(word: B256) -> String {
    String::from_utf8_lossy(word.as_slice())
        .trim_end_matches('\0')
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::transports::TransportErrorKind;

    #[test]
    fn bytes32_text_drops_padding() {
        let mut word = [0_u8; 32];
        word[..3].copy_from_slice(b"MKR");
        assert_eq!(bytes32_text(B256::from(word)), "MKR");
        assert_eq!(bytes32_text(B256::ZERO), "");
    }

    #[test]
    fn transport_failures_are_transient() {
        let err = TransportErrorKind::custom_str("connection refused");
        assert!(matches!(
            classify_transport_error("balanceOf", err),
            TokenError::RpcUnavailable(_)
        ));
    }

    #[test]
    fn undecodable_calls_are_final() {
        let err = ContractError::UnknownFunction("decimals".to_owned());
        let classified = classify_call_error("decimals", err);
        assert!(matches!(classified, TokenError::ContractCallReverted(_)));
    }
}
