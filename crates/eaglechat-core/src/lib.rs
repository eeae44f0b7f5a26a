//! EagleChat Core — domain models, error taxonomy, repository traits,
//! and input validation.
//!
//! This crate has no I/O. The database and auth crates depend on it;
//! it depends on nothing but the type stack.

pub mod error;
pub mod models;
pub mod repository;
pub mod validators;

pub use error::{DuplicateKind, Error, Result};
pub use models::provider::Provider;
