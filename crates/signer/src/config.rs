//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::server::trust::{DEFAULT_ALLOWED_ORIGINS, PolicyError, TrustPolicy};
use crate::server::{DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_ROUTE_PREFIX, RouterOptions};
use crate::signing::KeyStore;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("route prefix must be empty or start with '/'")]
    RoutePrefix,
    #[error("max payload size must be greater than zero")]
    MaxPayload,
}

/// Signing oracle for the QZ Tray trusted-printing agent
#[derive(Parser, Debug, Clone)]
#[command(name = "qz-signer")]
pub struct Args {
    #[arg(long, env = "QZ_SIGNER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "QZ_SIGNER_PORT", default_value = "8000")]
    pub port: u16,

    /// Directory the key and certificate paths are resolved against
    #[arg(long, env = "QZ_TRAY_STORAGE_DIR", default_value = "storage/app")]
    pub storage_dir: PathBuf,

    /// PEM private key (PKCS#8 or PKCS#1), relative to the storage directory
    #[arg(long, env = "QZ_TRAY_PRIVATE_KEY", default_value = "certs/key.pem")]
    pub private_key: PathBuf,

    /// PEM certificate served to callers, relative to the storage directory
    #[arg(long, env = "QZ_TRAY_CERTIFICATE", default_value = "certs/cert.pem")]
    pub certificate: PathBuf,

    /// Extra origins allowed to call the oracle (comma separated)
    #[arg(long, env = "QZ_TRAY_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Do not include the built-in localhost development origins
    #[arg(long, env = "QZ_TRAY_NO_DEFAULT_ORIGINS", default_value = "false")]
    pub no_default_origins: bool,

    /// Enable development mode (permits --allow-any-origin)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Accept requests from any origin. Development mode only.
    #[arg(long, env = "QZ_TRAY_ALLOW_ANY_ORIGIN", default_value = "false")]
    pub allow_any_origin: bool,

    /// Send Access-Control-Allow-Credentials. Incompatible with any-origin.
    #[arg(long, env = "QZ_TRAY_ALLOW_CREDENTIALS", default_value = "false")]
    pub allow_credentials: bool,

    /// Seconds browsers may cache a preflight response
    #[arg(long, env = "QZ_TRAY_CORS_MAX_AGE")]
    pub cors_max_age: Option<u64>,

    #[arg(long, env = "QZ_TRAY_ROUTE_PREFIX", default_value = DEFAULT_ROUTE_PREFIX)]
    pub route_prefix: String,

    #[arg(long, env = "QZ_TRAY_MAX_PAYLOAD_BYTES", default_value_t = DEFAULT_MAX_PAYLOAD_BYTES)]
    pub max_payload_bytes: usize,

    /// Exit at startup if the key or certificate cannot be loaded
    #[arg(long, env = "QZ_TRAY_REQUIRE_KEY_MATERIAL", default_value = "false")]
    pub require_key_material: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn trust_policy(&self) -> Result<TrustPolicy, ConfigError> {
        let defaults = if self.no_default_origins {
            &[][..]
        } else {
            &DEFAULT_ALLOWED_ORIGINS[..]
        };

        Ok(TrustPolicy::builder()
            .origins(defaults)
            .origins(&self.allowed_origins)
            .allow_any_origin(self.allow_any_origin)
            .dev_mode(self.dev_mode)
            .allow_credentials(self.allow_credentials)
            .max_age(self.cors_max_age.map(Duration::from_secs))
            .build()?)
    }

    pub fn router_options(&self) -> Result<RouterOptions, ConfigError> {
        if !self.route_prefix.is_empty() && !self.route_prefix.starts_with('/') {
            return Err(ConfigError::RoutePrefix);
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::MaxPayload);
        }
        Ok(RouterOptions {
            route_prefix: self.route_prefix.clone(),
            max_payload_bytes: self.max_payload_bytes,
        })
    }

    pub fn key_store(&self) -> KeyStore {
        KeyStore::new(
            self.storage_dir.join(&self.private_key),
            self.storage_dir.join(&self.certificate),
        )
    }
}
