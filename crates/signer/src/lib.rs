pub mod config;
pub mod error;
pub mod server;
pub mod signing;

pub use server::{AppState, RouterOptions, router, run};
pub use server::trust::{AllowedOrigins, TrustPolicy};
pub use signing::{KeyStore, KeyStoreError, QZ_SIGNATURE_ALGORITHM, SignatureAlgorithm};
