use axum::{Json, extract::State, http::StatusCode};
use tg_api_types::GateStatus;

use crate::{AppState, ApiResult, runtime_error};

pub(crate) async fn gate_status(State(state): State<AppState>) -> Json<GateStatus> {
    Json(state.gate.status())
}

pub(crate) async fn verify(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.gate.verify().map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn switch_network(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.gate.switch_network().map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn retry(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.gate.retry().map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub(crate) async fn close(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.gate.close().map_err(runtime_error)?;
    Ok(StatusCode::ACCEPTED)
}
