//! Read-only inspection of the served certificate.
//!
//! The oracle never interprets the certificate when serving it. This is
//! only used at startup to log a fingerprint and to catch a certificate
//! that does not belong to the configured private key.

use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use sha2::{Digest, Sha256};
use x509_parser::pem::parse_x509_pem;

/// Maximum certificate size (16KB is generous for a single cert)
pub const MAX_CERT_SIZE: usize = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("certificate too large: {0} bytes (max {MAX_CERT_SIZE})")]
    TooLarge(usize),
    #[error("no PEM certificate block found")]
    NotPem,
    #[error("malformed X.509 certificate")]
    Malformed,
}

#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// Hex SHA-256 over the DER encoding.
    pub fingerprint: String,
    pub subject: String,
    pub not_after: String,
    pub currently_valid: bool,
    /// `None` when the certificate does not carry an RSA key.
    pub public_key: Option<RsaPublicKey>,
}

impl CertificateInfo {
    pub fn from_pem(pem: &str) -> Result<Self, CertificateError> {
        if pem.len() > MAX_CERT_SIZE {
            return Err(CertificateError::TooLarge(pem.len()));
        }

        let (_, block) = parse_x509_pem(pem.as_bytes()).map_err(|_| CertificateError::NotPem)?;
        let cert = block.parse_x509().map_err(|_| CertificateError::Malformed)?;

        let validity = cert.validity();
        let not_after = validity
            .not_after
            .to_rfc2822()
            .unwrap_or_else(|_| validity.not_after.timestamp().to_string());

        Ok(Self {
            fingerprint: hex::encode(Sha256::digest(&block.contents)),
            subject: cert.subject().to_string(),
            not_after,
            currently_valid: validity.is_valid(),
            public_key: RsaPublicKey::from_public_key_der(cert.public_key().raw).ok(),
        })
    }
}
