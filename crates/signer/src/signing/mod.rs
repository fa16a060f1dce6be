mod certificate;
mod key_handle;
mod key_store;
mod protocol;

pub use certificate::{CertificateError, CertificateInfo};
pub use key_handle::{KeyHandle, MIN_KEY_BITS, QZ_SIGNATURE_ALGORITHM, SignatureAlgorithm};
pub use key_store::{KeyMaterialReport, KeyStore, KeyStoreError};
pub use protocol::{Envelope, SignRequest, ValidationError};
