//! EagleChat Auth — the credential and trust services: tenant
//! registration with callback attestation, HMAC request signing and
//! verification, and provider-key brokering.
//!
//! Services are generic over the core repository traits so this crate
//! never depends on the database implementation.

pub mod broker;
pub mod callback;
pub mod config;
pub mod hmac_service;
pub mod probe;
pub mod registration;
pub mod signature;

pub use broker::KeyBroker;
pub use callback::{CallbackVerifier, WordPressCallbackClient};
pub use config::AuthConfig;
pub use hmac_service::HmacService;
pub use probe::{HttpKeyProbe, KeyProbe, ProbeFailure};
pub use registration::RegistrationService;
pub use signature::SignatureEnvelope;
