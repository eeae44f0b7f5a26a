//! EagleChat Vault — authenticated encryption under a process-wide
//! data-encryption key, plus credential minting and constant-time
//! comparison.
//!
//! The vault is immutable shared state: the key is derived once from
//! the operator master secret before serving begins and never rotated
//! in-process.

mod error;
mod seal;
pub mod tokens;

pub use error::VaultError;
pub use seal::Vault;
