/// Chat message model
///
/// Message bodies are free-form JSON whose shape depends on `message_type`
/// (`{"text": ...}`, `{"url": ...}`, `{"lat": .., "lng": ..}` and so on).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE messages (
///     id            BLOB PRIMARY KEY NOT NULL,
///     chat_id       BLOB NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
///     sender_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     message_type  TEXT NOT NULL,
///     content       TEXT NOT NULL,
///     created_at    TEXT NOT NULL,
///     updated_at    TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::SqliteExecutor;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Location,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Location => "location",
            MessageType::File => "file",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub message_type: MessageType,
    pub content: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Inserts a message stamped with `at`
    pub async fn insert<'e, E>(
        executor: E,
        chat_id: Uuid,
        sender_id: &str,
        message_type: MessageType,
        content: &JsonValue,
        at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, message_type, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, chat_id, sender_id, message_type, content, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(sender_id)
        .bind(message_type)
        .bind(content)
        .bind(at)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(message)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender_id, message_type, content, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(message)
    }

    /// Messages of a chat in the order they were sent
    pub async fn list_by_chat<'e, E>(executor: E, chat_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender_id, message_type, content, created_at, updated_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(executor)
        .await?;

        Ok(messages)
    }

    /// Returns true if a row was deleted
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_chat<'e, E>(executor: E, chat_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }
}
