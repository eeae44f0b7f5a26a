//! SurrealDB repository implementations.

mod conversation;
mod tenant;

pub use conversation::SurrealConversationRepository;
pub use tenant::SurrealTenantRepository;
