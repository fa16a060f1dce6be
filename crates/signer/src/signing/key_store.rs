use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::certificate::CertificateInfo;
use super::key_handle::{KeyHandle, SignatureAlgorithm};

/// Failures raised while reading or using key material.
///
/// Messages name files by their file name only and never carry key bytes
/// or text produced by the crypto library.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("private key not found")]
    KeyNotFound,
    #[error("certificate not found")]
    CertificateNotFound,
    #[error("unable to load private key: {0}")]
    KeyParse(&'static str),
    #[error("failed to create {0} signature")]
    SigningFailure(&'static str),
    #[error("failed to read {file}: {kind}")]
    Io { file: String, kind: io::ErrorKind },
}

/// Owner of the deployment's private key and certificate.
///
/// Both files are read on first use (or by [`KeyStore::preload`]) and kept
/// for the life of the process. A failed read is not cached, so a file put
/// in place after startup is picked up by the next request.
#[derive(Debug)]
pub struct KeyStore {
    private_key_path: PathBuf,
    certificate_path: PathBuf,
    key: OnceCell<Arc<KeyHandle>>,
    certificate: OnceCell<String>,
}

/// What [`KeyStore::preload`] found on disk.
#[derive(Debug)]
pub struct KeyMaterialReport {
    pub key_bits: usize,
    /// `None` when the certificate file is present but not a parseable X.509 PEM.
    pub certificate: Option<CertificateInfo>,
    /// Whether the certificate's public key belongs to the private key.
    pub pair_matches: Option<bool>,
}

impl KeyStore {
    pub fn new(private_key_path: impl Into<PathBuf>, certificate_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
            certificate_path: certificate_path.into(),
            key: OnceCell::new(),
            certificate: OnceCell::new(),
        }
    }

    /// Load the private key, reading it from disk at most once.
    pub async fn load_private_key(&self) -> Result<&KeyHandle, KeyStoreError> {
        self.shared_key().await.map(Arc::as_ref)
    }

    async fn shared_key(&self) -> Result<&Arc<KeyHandle>, KeyStoreError> {
        self.key
            .get_or_try_init(|| async {
                let file = file_name(&self.private_key_path);
                let bytes = Zeroizing::new(
                    read(&self.private_key_path, KeyStoreError::KeyNotFound).await?,
                );
                let pem = std::str::from_utf8(&bytes)
                    .map_err(|_| KeyStoreError::KeyParse("private key is not PEM text"))?;
                let handle = KeyHandle::from_pem(pem)?;
                info!(file = %file, bits = handle.key_bits(), "loaded private key");
                Ok::<_, KeyStoreError>(Arc::new(handle))
            })
            .await
    }

    /// Load the PEM certificate text, reading it from disk at most once.
    pub async fn load_certificate(&self) -> Result<&str, KeyStoreError> {
        self.certificate
            .get_or_try_init(|| async {
                let bytes = read(&self.certificate_path, KeyStoreError::CertificateNotFound).await?;
                let pem = String::from_utf8(bytes).map_err(|_| KeyStoreError::Io {
                    file: file_name(&self.certificate_path),
                    kind: io::ErrorKind::InvalidData,
                })?;
                info!(file = %file_name(&self.certificate_path), "loaded certificate");
                Ok::<_, KeyStoreError>(pem)
            })
            .await
            .map(String::as_str)
    }

    /// Sign `payload` with the stored private key. The RSA operation runs on
    /// the blocking pool so it never stalls the runtime's worker threads.
    pub async fn sign(
        &self,
        payload: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> Result<Vec<u8>, KeyStoreError> {
        let key = Arc::clone(self.shared_key().await?);
        let owned = payload.to_vec();
        let signature = tokio::task::spawn_blocking(move || key.sign_with(&owned, algorithm))
            .await
            .map_err(|_| KeyStoreError::SigningFailure(algorithm.as_str()))??;
        debug!(payload_len = payload.len(), %algorithm, "signed payload");
        Ok(signature)
    }

    /// Load both files up front and inspect the certificate.
    pub async fn preload(&self) -> Result<KeyMaterialReport, KeyStoreError> {
        let key = self.load_private_key().await?;
        let pem = self.load_certificate().await?;

        let certificate = CertificateInfo::from_pem(pem).ok();
        let pair_matches = certificate
            .as_ref()
            .map(|info| info.public_key.as_ref() == Some(key.public_key()));

        Ok(KeyMaterialReport {
            key_bits: key.key_bits(),
            certificate,
            pair_matches,
        })
    }

    pub fn is_key_loaded(&self) -> bool {
        self.key.initialized()
    }

    pub fn private_key_file(&self) -> String {
        file_name(&self.private_key_path)
    }

    pub fn certificate_file(&self) -> String {
        file_name(&self.certificate_path)
    }
}

async fn read(path: &Path, not_found: KeyStoreError) -> Result<Vec<u8>, KeyStoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(file = %file_name(path), "file does not exist");
            Err(not_found)
        }
        Err(err) => Err(KeyStoreError::Io {
            file: file_name(path),
            kind: err.kind(),
        }),
    }
}

/// The last path component, so logs and errors never spell out the
/// storage layout.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<unnamed>".to_string())
}
