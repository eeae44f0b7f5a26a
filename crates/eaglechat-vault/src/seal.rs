//! Seal/open under the derived data-encryption key.
//!
//! Envelope layout: `version(1) ‖ nonce(12) ‖ ciphertext+tag`, base64
//! encoded. The version byte lets a future key or cipher change coexist
//! with stored ciphertexts.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pbkdf2::pbkdf2_hmac_array;
use sha2::Sha256;

use crate::error::VaultError;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const ENVELOPE_VERSION: u8 = 0x01;

/// Fixed KDF salt. The master secret is high-entropy; the KDF's role
/// is stretching, not per-ciphertext uniqueness, which the per-seal
/// nonce provides.
const KDF_SALT: &[u8] = b"eaglechat_salt_v1";
const KDF_ITERATIONS: u32 = 100_000;

/// Master-keyed secret vault. Cheap to clone behind an `Arc`; holds
/// only the derived key.
pub struct Vault {
    key: [u8; KEY_SIZE],
}

impl Vault {
    /// Derive the data-encryption key from the operator master secret.
    /// Done once at process start.
    pub fn new(master_key: &[u8]) -> Self {
        let key = pbkdf2_hmac_array::<Sha256, KEY_SIZE>(master_key, KDF_SALT, KDF_ITERATIONS);
        Self { key }
    }

    /// Encrypt and authenticate a secret for storage.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, VaultError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| VaultError::Crypto(format!("AES-GCM encrypt: {e}")))?;

        let mut envelope = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(envelope))
    }

    /// Decrypt a sealed value. Every failure mode is `SealIntegrity`.
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, VaultError> {
        let envelope = STANDARD
            .decode(sealed)
            .map_err(|_| VaultError::SealIntegrity)?;

        // Version byte, nonce, and at least the 16-byte tag.
        if envelope.len() < 1 + NONCE_SIZE + 16 {
            return Err(VaultError::SealIntegrity);
        }
        if envelope[0] != ENVELOPE_VERSION {
            return Err(VaultError::SealIntegrity);
        }

        let (nonce_bytes, ciphertext) = envelope[1..].split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::SealIntegrity)
    }

    /// Open a sealed value expected to be UTF-8 (API keys, HMAC secrets).
    pub fn open_string(&self, sealed: &str) -> Result<String, VaultError> {
        String::from_utf8(self.open(sealed)?).map_err(|_| VaultError::SealIntegrity)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}
