use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qz_signer::config::Args;
use qz_signer::{AllowedOrigins, AppState, QZ_SIGNATURE_ALGORITHM, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("qz_signer={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let policy = args.trust_policy().context("invalid trust policy")?;
    let options = args.router_options().context("invalid router options")?;
    let key_store = Arc::new(args.key_store());

    info!("mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("signature algorithm: {}", QZ_SIGNATURE_ALGORITHM);
    info!(
        "key material: {} / {}",
        key_store.private_key_file(),
        key_store.certificate_file()
    );
    match policy.origins() {
        AllowedOrigins::Any => warn!("accepting requests from ANY origin"),
        AllowedOrigins::List(origins) => {
            for origin in origins {
                info!("allowed origin: {}", origin);
            }
        }
    }

    match key_store.preload().await {
        Ok(report) => {
            info!(bits = report.key_bits, "private key ready");
            match &report.certificate {
                Some(cert) => {
                    info!(subject = %cert.subject, not_after = %cert.not_after, "certificate ready");
                    info!("certificate fingerprint (sha256): {}", cert.fingerprint);
                    if !cert.currently_valid {
                        warn!("certificate is outside its validity period");
                    }
                }
                None => warn!("certificate is not a parseable X.509 PEM"),
            }
            if report.pair_matches == Some(false) {
                warn!("certificate public key does not match the private key; the agent will reject signatures");
            }
        }
        Err(err) if args.require_key_material => {
            return Err(err).context("key material unavailable");
        }
        Err(err) => {
            warn!(error = %err, "key material unavailable; will retry on first request");
        }
    }

    run(
        args.host.clone(),
        args.port,
        AppState {
            key_store,
            policy: Arc::new(policy),
        },
        options,
    )
    .await
}
