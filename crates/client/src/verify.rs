//! Local signature verification, mirroring the check the agent performs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha1::Sha1;
use x509_parser::pem::parse_x509_pem;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("certificate is not a valid X.509 PEM")]
    Certificate,
    #[error("certificate does not carry an RSA public key")]
    NotRsa,
    #[error("signature is not valid base64")]
    Encoding,
    #[error("signature does not verify against the certificate")]
    Mismatch,
}

pub fn certificate_public_key(pem: &str) -> Result<RsaPublicKey, VerifyError> {
    let (_, block) = parse_x509_pem(pem.as_bytes()).map_err(|_| VerifyError::Certificate)?;
    let cert = block.parse_x509().map_err(|_| VerifyError::Certificate)?;
    RsaPublicKey::from_public_key_der(cert.public_key().raw).map_err(|_| VerifyError::NotRsa)
}

/// Verify a base64 RSA/SHA-1 signature over `payload` against `certificate_pem`.
pub fn verify_signature(
    certificate_pem: &str,
    payload: &[u8],
    signature_b64: &str,
) -> Result<(), VerifyError> {
    let public_key = certificate_public_key(certificate_pem)?;
    let bytes = STANDARD
        .decode(signature_b64)
        .map_err(|_| VerifyError::Encoding)?;
    let signature = Signature::try_from(bytes.as_slice()).map_err(|_| VerifyError::Mismatch)?;
    VerifyingKey::<Sha1>::new(public_key)
        .verify(payload, &signature)
        .map_err(|_| VerifyError::Mismatch)
}
