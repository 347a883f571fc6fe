//! Wallet-event ingress from the browser shim, and the queue it drains.

use axum::{Json, extract::State, http::StatusCode};
use tg_api_types::{
    WalletAddress, WalletChainRequest, WalletConnectRequest, WalletRequestsResponse,
};
use tg_chain_client::parse_wallet_address;

use crate::{AppState, ApiResult, bad_request, runtime_error};

pub(crate) async fn connect(
    State(state): State<AppState>,
    Json(request): Json<WalletConnectRequest>,
) -> ApiResult<StatusCode> {
    let address = WalletAddress(request.wallet_address.trim().to_owned());
    parse_wallet_address(&address).map_err(|err| bad_request(&err.to_string()))?;

    state
        .gate
        .connect(address, request.chain_id)
        .map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn chain_changed(
    State(state): State<AppState>,
    Json(request): Json<WalletChainRequest>,
) -> ApiResult<StatusCode> {
    state
        .gate
        .chain_changed(request.chain_id)
        .map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn disconnect(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.gate.disconnect().map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn requests(State(state): State<AppState>) -> Json<WalletRequestsResponse> {
    Json(WalletRequestsResponse {
        requests: state.relay.drain().await,
    })
}
