/// Chat thread model
///
/// One thread exists per unordered (homeowner, worker) pair. The unique expression index
/// `chats_participants_key` makes a duplicate insert fail even when the two ids arrive
/// swapped.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE chats (
///     id            BLOB PRIMARY KEY NOT NULL,
///     homeowner_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     worker_id     TEXT NOT NULL REFERENCES worker_profiles(id) ON DELETE CASCADE,
///     created_at    TEXT NOT NULL,
///     updated_at    TEXT NOT NULL,
///     CONSTRAINT chats_distinct_parties CHECK (homeowner_id <> worker_id)
/// );
///
/// CREATE UNIQUE INDEX chats_participants_key
///     ON chats (min(homeowner_id, worker_id), max(homeowner_id, worker_id));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use super::message::Message;
use super::utc_now;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id: Uuid,
    pub homeowner_id: String,
    pub worker_id: String,
    pub created_at: DateTime<Utc>,

    /// Bumped on every appended message
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.homeowner_id == user_id || self.worker_id == user_id
    }

    /// The other party of the thread, from `user_id`'s point of view
    pub fn counterpart(&self, user_id: &str) -> &str {
        if self.homeowner_id == user_id {
            &self.worker_id
        } else {
            &self.homeowner_id
        }
    }
}

/// One inbox line: a thread, both parties and its latest message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    pub chat: Chat,
    pub homeowner_name: String,
    pub homeowner_avatar: Option<String>,
    pub worker_name: String,
    pub worker_avatar: Option<String>,
    pub last_message: Option<Message>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for InboxEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let chat = Chat {
            id: row.try_get("chat_id")?,
            homeowner_id: row.try_get("homeowner_id")?,
            worker_id: row.try_get("worker_id")?,
            created_at: row.try_get("chat_created_at")?,
            updated_at: row.try_get("chat_updated_at")?,
        };

        let last_message = match row.try_get::<Option<Uuid>, _>("message_id")? {
            Some(id) => Some(Message {
                id,
                chat_id: chat.id,
                sender_id: row.try_get("message_sender_id")?,
                message_type: row.try_get("message_type")?,
                content: row.try_get("message_content")?,
                created_at: row.try_get("message_created_at")?,
                updated_at: row.try_get("message_updated_at")?,
            }),
            None => None,
        };

        Ok(InboxEntry {
            chat,
            homeowner_name: row.try_get("homeowner_name")?,
            homeowner_avatar: row.try_get("homeowner_avatar")?,
            worker_name: row.try_get("worker_name")?,
            worker_avatar: row.try_get("worker_avatar")?,
            last_message,
        })
    }
}

impl Chat {
    /// Inserts a thread for the pair
    ///
    /// # Errors
    ///
    /// A unique violation on `chats_participants_key` if the pair already has a thread,
    /// a foreign key violation if `worker_id` has no worker profile.
    pub async fn insert<'e, E>(
        executor: E,
        homeowner_id: &str,
        worker_id: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (id, homeowner_id, worker_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, homeowner_id, worker_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(homeowner_id)
        .bind(worker_id)
        .bind(now)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(chat)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let chat = sqlx::query_as::<_, Chat>(
            "SELECT id, homeowner_id, worker_id, created_at, updated_at FROM chats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(chat)
    }

    /// Finds the thread of an unordered pair
    pub async fn find_by_pair<'e, E>(
        executor: E,
        first: &str,
        second: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, homeowner_id, worker_id, created_at, updated_at
            FROM chats
            WHERE min(homeowner_id, worker_id) = min($1, $2)
              AND max(homeowner_id, worker_id) = max($1, $2)
            "#,
        )
        .bind(first)
        .bind(second)
        .fetch_optional(executor)
        .await?;

        Ok(chat)
    }

    pub async fn count_by_pair<'e, E>(executor: E, first: &str, second: &str) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM chats
            WHERE min(homeowner_id, worker_id) = min($1, $2)
              AND max(homeowner_id, worker_id) = max($1, $2)
            "#,
        )
        .bind(first)
        .bind(second)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Sets `updated_at`, returning false if the chat does not exist
    pub async fn touch<'e, E>(executor: E, id: Uuid, at: DateTime<Utc>) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a thread and, by cascade, its messages
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Threads the user takes part in, most recently active first
    pub async fn list_inbox<'e, E>(executor: E, user_id: &str) -> Result<Vec<InboxEntry>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let entries = sqlx::query_as::<_, InboxEntry>(
            r#"
            SELECT c.id AS chat_id,
                   c.homeowner_id AS homeowner_id,
                   c.worker_id AS worker_id,
                   c.created_at AS chat_created_at,
                   c.updated_at AS chat_updated_at,
                   hu.name AS homeowner_name,
                   hu.avatar_url AS homeowner_avatar,
                   wu.name AS worker_name,
                   wu.avatar_url AS worker_avatar,
                   m.id AS message_id,
                   m.sender_id AS message_sender_id,
                   m.message_type AS message_type,
                   m.content AS message_content,
                   m.created_at AS message_created_at,
                   m.updated_at AS message_updated_at
            FROM chats c
            JOIN users hu ON hu.id = c.homeowner_id
            JOIN users wu ON wu.id = c.worker_id
            LEFT JOIN messages m ON m.id = (
                SELECT m2.id
                FROM messages m2
                WHERE m2.chat_id = c.id
                ORDER BY m2.created_at DESC, m2.rowid DESC
                LIMIT 1
            )
            WHERE c.homeowner_id = $1 OR c.worker_id = $1
            ORDER BY c.updated_at DESC, c.rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }
}
