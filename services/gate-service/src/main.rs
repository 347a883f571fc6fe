mod config_api;
mod settings;
mod verification;
mod wallet_api;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tg_chain_client::ChainRegistry;
use tg_chain_evm::EvmRpcReader;
use tg_gate_core::{
    ConfigStore, GateHandle, GateRuntime, RelayWallet, RuntimeError, SessionTimings,
    TokenBalanceReader, WidgetSignal,
};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::settings::ServiceConfig;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

pub(crate) type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: ConfigStore,
    pub registry: Arc<ChainRegistry>,
    pub gate: GateHandle,
    pub relay: Arc<RelayWallet>,
}

impl AppState {
    fn new(
        config: ConfigStore,
        registry: Arc<ChainRegistry>,
        reader: TokenBalanceReader,
        relay: Arc<RelayWallet>,
        timings: SessionTimings,
        signals: Option<mpsc::UnboundedSender<WidgetSignal>>,
    ) -> Self {
        let mut runtime = GateRuntime::new(
            config.clone(),
            registry.clone(),
            Arc::new(reader),
            relay.clone(),
        )
        .with_timings(timings);
        if let Some(signals) = signals {
            runtime = runtime.with_signals(signals);
        }

        Self {
            config,
            registry,
            gate: runtime.spawn(),
            relay,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = ServiceConfig::from_env()?;

    // Overridden endpoints are the primary read path; the public defaults
    // back them up. Without overrides there is a single source.
    let primary = EvmRpcReader::from_env("rpc-primary");
    let reader = if primary.has_overrides() {
        TokenBalanceReader::new(Arc::new(primary))
            .with_fallback(Arc::new(EvmRpcReader::new("rpc-public")))
    } else {
        TokenBalanceReader::new(Arc::new(primary))
    };

    let (signals_tx, mut signals_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(signal) = signals_rx.recv().await {
            match signal {
                WidgetSignal::VerificationComplete { session_id } => {
                    info!(session = %session_id, "verification complete");
                }
                WidgetSignal::Closed { session_id } => {
                    info!(session = %session_id, "verification widget closed");
                }
            }
        }
    });

    let state = AppState::new(
        ConfigStore::new(settings.gating.clone()),
        Arc::new(ChainRegistry::builtin()),
        reader,
        Arc::new(RelayWallet::new(settings.wallet_switch)),
        SessionTimings::default(),
        Some(signals_tx),
    );

    let app = build_router(state).layer(CorsLayer::permissive());

    info!(
        enabled = settings.gating.enabled,
        chain = %settings.gating.chain,
        "gate-service listening on {}",
        settings.bind_addr
    );
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/chains", get(config_api::chains))
        .route("/config", get(config_api::get_config).put(config_api::put_config))
        .route("/gate", get(verification::gate_status))
        .route("/wallet/connect", post(wallet_api::connect))
        .route("/wallet/chain", post(wallet_api::chain_changed))
        .route("/wallet/disconnect", post(wallet_api::disconnect))
        .route("/wallet/requests", get(wallet_api::requests))
        .route("/verification/verify", post(verification::verify))
        .route("/verification/switch", post(verification::switch_network))
        .route("/verification/retry", post(verification::retry))
        .route("/verification/close", post(verification::close))
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "gate-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "gate-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

pub(crate) fn runtime_error(err: RuntimeError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
