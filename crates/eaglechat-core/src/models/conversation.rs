//! Conversation and message models.
//!
//! A conversation is a tenant-scoped append-only log identified by
//! `(tenant_id, session_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub session_id: String,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<MessageRole> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub tenant_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub ts: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// A message to append; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

/// How much prior conversation to feed back into a chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryWindow {
    Short,
    Medium,
    Long,
}

impl MemoryWindow {
    /// Number of user/assistant exchanges retained.
    pub fn exchanges(&self) -> u64 {
        match self {
            MemoryWindow::Short => 3,
            MemoryWindow::Medium => 8,
            MemoryWindow::Long => 15,
        }
    }
}

impl Default for MemoryWindow {
    fn default() -> Self {
        MemoryWindow::Medium
    }
}
