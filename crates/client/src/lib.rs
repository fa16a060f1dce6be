mod client;
pub mod verify;

pub use client::{BridgeError, DEFAULT_BASE_URL, Handshake, OracleResponse, SigningOracleClient};
