//! Vault error types.

use eaglechat_core::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Any failure to open a ciphertext: bad encoding, truncation,
    /// unknown version, or tag mismatch. Collapsed to one variant so
    /// the failure mode leaks nothing about which check tripped.
    #[error("sealed value failed integrity check")]
    SealIntegrity,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<VaultError> for Error {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::SealIntegrity => Error::SealIntegrity,
            VaultError::Crypto(msg) => Error::Internal(msg),
        }
    }
}
