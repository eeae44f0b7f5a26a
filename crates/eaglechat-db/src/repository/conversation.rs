//! SurrealDB implementation of [`ConversationRepository`].
//!
//! Conversations are get-or-created under the unique
//! `(tenant_id, session_id)` index; messages are append-only.

use chrono::{DateTime, Utc};
use eaglechat_core::error::Result;
use eaglechat_core::models::conversation::{Conversation, Message, MessageRole, NewMessage};
use eaglechat_core::repository::ConversationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, is_unique_violation};

#[derive(Debug, SurrealValue)]
struct ConversationRow {
    record_id: String,
    tenant_id: String,
    session_id: String,
    user_ip: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl ConversationRow {
    fn try_into_conversation(self) -> std::result::Result<Conversation, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid conversation UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Decode(format!("invalid tenant UUID: {e}")))?;
        Ok(Conversation {
            id,
            tenant_id,
            session_id: self.session_id,
            user_ip: self.user_ip,
            user_agent: self.user_agent,
            created_at: self.created_at,
            updated_at: self.updated_at,
            metadata: self.metadata,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct MessageRow {
    record_id: String,
    conversation_id: String,
    tenant_id: String,
    role: String,
    content: String,
    ts: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl MessageRow {
    fn try_into_message(self) -> std::result::Result<Message, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid message UUID: {e}")))?;
        let conversation_id = Uuid::parse_str(&self.conversation_id)
            .map_err(|e| DbError::Decode(format!("invalid conversation UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Decode(format!("invalid tenant UUID: {e}")))?;
        let role = MessageRole::parse(&self.role)
            .ok_or_else(|| DbError::Decode(format!("unknown message role: {}", self.role)))?;
        Ok(Message {
            id,
            conversation_id,
            tenant_id,
            role,
            content: self.content,
            ts: self.ts,
            metadata: self.metadata,
        })
    }
}

/// SurrealDB implementation of the Conversation repository.
#[derive(Clone)]
pub struct SurrealConversationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealConversationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find(
        &self,
        tenant_id: Uuid,
        session_id: &str,
    ) -> Result<Option<Conversation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM conversation \
                 WHERE tenant_id = $tenant_id AND session_id = $session_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConversationRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_conversation()?)),
            None => Ok(None),
        }
    }
}

impl<C: Connection> ConversationRepository for SurrealConversationRepository<C> {
    async fn ensure(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        user_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Conversation> {
        if let Some(existing) = self.find(tenant_id, session_id).await? {
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let created = self
            .db
            .query(
                "CREATE type::record('conversation', $id) SET \
                 tenant_id = $tenant_id, \
                 session_id = $session_id, \
                 user_ip = $user_ip, \
                 user_agent = $user_agent",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("session_id", session_id.to_string()))
            .bind(("user_ip", user_ip.map(str::to_string)))
            .bind(("user_agent", user_agent.map(str::to_string)))
            .await
            .map_err(DbError::from)?
            .check();

        match created {
            Ok(_) => {}
            // Lost a creation race; the winner's row is the truth.
            Err(e) if is_unique_violation(&e.to_string()) => {}
            Err(e) => return Err(DbError::Statement(e.to_string()).into()),
        }

        self.find(tenant_id, session_id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "conversation".into(),
                id: format!("tenant={tenant_id},session={session_id}"),
            }
            .into()
        })
    }

    async fn append(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        message: NewMessage,
    ) -> Result<Message> {
        let conversation = self.ensure(tenant_id, session_id, None, None).await?;

        let id = Uuid::new_v4();
        let metadata = message
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        self.db
            .query(
                "CREATE type::record('message', $id) SET \
                 conversation_id = $conversation_id, \
                 tenant_id = $tenant_id, \
                 role = $role, \
                 content = $content, \
                 metadata = $metadata; \
                 UPDATE type::record('conversation', $conversation_id) \
                 SET updated_at = time::now();",
            )
            .bind(("id", id.to_string()))
            .bind(("conversation_id", conversation.id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role", message.role.as_str()))
            .bind(("content", message.content))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Statement(e.to_string()))?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('message', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "message".into(),
            id: id.to_string(),
        })?;

        Ok(row.try_into_message()?)
    }

    async fn history(
        &self,
        tenant_id: Uuid,
        session_id: &str,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let Some(conversation) = self.find(tenant_id, session_id).await? else {
            return Ok(Vec::new());
        };

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM message \
                 WHERE conversation_id = $conversation_id \
                 AND tenant_id = $tenant_id \
                 ORDER BY ts DESC LIMIT $limit",
            )
            .bind(("conversation_id", conversation.id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MessageRow> = result.take(0).map_err(DbError::from)?;
        let mut messages = rows
            .into_iter()
            .map(|row| row.try_into_message())
            .collect::<std::result::Result<Vec<_>, DbError>>()?;

        // Query returns newest-first; callers want chronological order.
        messages.reverse();
        Ok(messages)
    }
}
