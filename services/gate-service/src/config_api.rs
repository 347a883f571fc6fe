use axum::{Json, extract::State};
use tg_api_types::{ChainListResponse, ConfigUpdateRequest, GatingConfig};
use tracing::info;

use crate::AppState;

pub(crate) async fn chains(State(state): State<AppState>) -> Json<ChainListResponse> {
    Json(ChainListResponse {
        chains: state.registry.chain_infos(),
    })
}

pub(crate) async fn get_config(State(state): State<AppState>) -> Json<GatingConfig> {
    Json(state.config.get())
}

/// Partial update; the running session keeps the config it started with.
pub(crate) async fn put_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdateRequest>,
) -> Json<GatingConfig> {
    state.config.apply(update);
    let config = state.config.get();
    info!(
        enabled = config.enabled,
        chain = %config.chain,
        token = %config.token_address,
        required = %config.required_amount,
        "gating config updated"
    );
    Json(config)
}
