pub mod trust;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tokio::signal;
use tracing::info;

use crate::error::OracleError;
use crate::signing::{Envelope, KeyStore, QZ_SIGNATURE_ALGORITHM, SignRequest, ValidationError};
use trust::{TrustPolicy, enforce};

pub const DEFAULT_ROUTE_PREFIX: &str = "/api/qz-tray";
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub key_store: Arc<KeyStore>,
    pub policy: Arc<TrustPolicy>,
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Path the oracle routes are nested under. Empty mounts them at the root.
    pub route_prefix: String,
    pub max_payload_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

pub fn router(state: AppState, options: &RouterOptions) -> Router {
    let oracle = Router::new()
        .route("/certificate", get(certificate_handler))
        .route("/sign", post(sign_handler))
        .layer(DefaultBodyLimit::max(options.max_payload_bytes))
        .layer(middleware::from_fn_with_state(state.policy.clone(), enforce))
        .with_state(state);

    let router = Router::new().route(
        "/healthcheck",
        get(|| async move { (StatusCode::OK, "Ok").into_response() }),
    );

    let prefix = options.route_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        router.merge(oracle)
    } else {
        router.nest(prefix, oracle)
    }
}

pub async fn run(host: String, port: u16, state: AppState, options: RouterOptions) -> Result<()> {
    let router = router(state, &options);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    info!(
        address = %listener.local_addr()?,
        prefix = %options.route_prefix,
        "signing oracle listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("signing oracle stopped");
    Ok(())
}

async fn certificate_handler(
    State(state): State<AppState>,
) -> Result<Json<Envelope>, OracleError> {
    let certificate = state
        .key_store
        .load_certificate()
        .await
        .map_err(OracleError::Certificate)?;
    Ok(Json(Envelope::certificate(certificate)))
}

async fn sign_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope>, OracleError> {
    let Json(body) = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            OracleError::PayloadTooLarge
        } else {
            OracleError::Validation(ValidationError::NotAnObject)
        }
    })?;
    let request = SignRequest::from_json(body)?;

    let signature = state
        .key_store
        .sign(request.data().as_bytes(), QZ_SIGNATURE_ALGORITHM)
        .await
        .map_err(OracleError::Sign)?;
    Ok(Json(Envelope::signature(STANDARD.encode(signature))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
