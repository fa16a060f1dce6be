use rand::RngCore;
use reqwest::header::ORIGIN;
use serde::{Deserialize, Serialize};

use crate::verify::{VerifyError, verify_signature};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/qz-tray";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("request to signing oracle failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The oracle answered with `success: false`; carries its message.
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected response from signing oracle (HTTP {0})")]
    Malformed(u16),
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Response body shape of both oracle endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResponse {
    pub success: bool,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct SignBody<'a> {
    data: &'a str,
}

/// Result of a full certificate + signature round against the oracle.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub challenge: String,
    pub certificate: String,
    pub signature: String,
}

/// Caller side of the signing oracle: the certificate and signature
/// callbacks the trusted-printing agent is configured with.
#[derive(Debug, Clone)]
pub struct SigningOracleClient {
    http: reqwest::Client,
    base_url: String,
    origin: Option<String>,
}

impl SigningOracleClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            origin: None,
        }
    }

    /// Send `origin` as the `Origin` header, as a browser page would.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Certificate callback: resolves with the PEM text.
    pub async fn fetch_certificate(&self) -> Result<String, BridgeError> {
        let request = self.http.get(format!("{}/certificate", self.base_url));
        let response = self.send(request).await?;
        match response {
            OracleResponse {
                success: true,
                certificate: Some(certificate),
                ..
            } => Ok(certificate),
            other => Err(rejection(other, "Failed to get certificate")),
        }
    }

    /// Signature callback: resolves with the base64 signature over `payload`.
    pub async fn sign(&self, payload: &str) -> Result<String, BridgeError> {
        let request = self
            .http
            .post(format!("{}/sign", self.base_url))
            .json(&SignBody { data: payload });
        let response = self.send(request).await?;
        match response {
            OracleResponse {
                success: true,
                signature: Some(signature),
                ..
            } => Ok(signature),
            other => Err(rejection(other, "Failed to sign data")),
        }
    }

    /// Fetch the certificate, have a fresh random challenge signed, and
    /// verify the signature the way the agent would.
    pub async fn handshake(&self) -> Result<Handshake, BridgeError> {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let challenge = nonce.iter().map(|b| format!("{b:02x}")).collect::<String>();

        let certificate = self.fetch_certificate().await?;
        let signature = self.sign(&challenge).await?;
        verify_signature(&certificate, challenge.as_bytes(), &signature)?;

        Ok(Handshake {
            challenge,
            certificate,
            signature,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<OracleResponse, BridgeError> {
        let request = match &self.origin {
            Some(origin) => request.header(ORIGIN, origin),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|_| BridgeError::Malformed(status))
    }
}

fn rejection(response: OracleResponse, fallback: &str) -> BridgeError {
    BridgeError::Rejected(response.message.unwrap_or_else(|| fallback.to_string()))
}
