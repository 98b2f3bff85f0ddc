/// Conversation threads between homeowners and workers
///
/// A pair of users shares exactly one thread. Appending a message and bumping the
/// thread's `updated_at` commit together, and the bumped value always moves forward,
/// so the inbox order reflects the latest message even for messages sent within the
/// same clock tick.
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::auth::CallerContext;
/// use handyhub_shared::conversations::ConversationManager;
/// use handyhub_shared::models::message::MessageType;
/// use serde_json::json;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let conversations = ConversationManager::new(pool);
///
/// let chat = conversations.get_or_create_chat("user_h1", "user_w1").await?;
///
/// let homeowner = CallerContext::homeowner("user_h1");
/// conversations
///     .append_message(&homeowner, chat.id, MessageType::Text, json!({"text": "Still free on Monday?"}))
///     .await?;
///
/// for entry in conversations.list_inbox("user_w1").await? {
///     println!("{} ↔ {}", entry.homeowner_name, entry.worker_name);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{require_ownership, require_participant};
use crate::auth::context::CallerContext;
use crate::error::{ConstraintKind, CoreError, CoreResult};
use crate::models::chat::{Chat, InboxEntry};
use crate::models::message::{Message, MessageType};
use crate::models::utc_now;

/// Next `updated_at` for a thread: now, but strictly after the previous value
pub fn next_activity(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}

fn participants(chat: &Chat) -> [&str; 2] {
    [chat.homeowner_id.as_str(), chat.worker_id.as_str()]
}

#[derive(Clone)]
pub struct ConversationManager {
    db: SqlitePool,
}

impl ConversationManager {
    pub fn new(db: SqlitePool) -> Self {
        ConversationManager { db }
    }

    /// Returns the pair's thread, creating it on first contact
    ///
    /// If a concurrent call creates the thread first, its thread is returned.
    ///
    /// # Errors
    ///
    /// - `ValidationFailure` if both ids are the same
    /// - `ConstraintViolation` (foreign key) if either user is missing or the worker
    ///   side has no worker profile
    pub async fn get_or_create_chat(&self, homeowner_id: &str, worker_id: &str) -> CoreResult<Chat> {
        if homeowner_id == worker_id {
            return Err(CoreError::validation("a chat needs two different participants"));
        }

        if let Some(chat) = Chat::find_by_pair(&self.db, homeowner_id, worker_id).await? {
            return Ok(chat);
        }

        match Chat::insert(&self.db, homeowner_id, worker_id).await {
            Ok(chat) => {
                info!(
                    chat_id = %chat.id,
                    homeowner_id = %chat.homeowner_id,
                    worker_id = %chat.worker_id,
                    "Chat created"
                );
                Ok(chat)
            }
            Err(err) => {
                let err = CoreError::from(err);
                if !err.is_unique_violation() {
                    return Err(err);
                }

                debug!(homeowner_id, worker_id, "Chat created concurrently, re-reading");

                Chat::find_by_pair(&self.db, homeowner_id, worker_id)
                    .await?
                    .ok_or(err)
            }
        }
    }

    pub async fn get_chat(&self, caller: &CallerContext, chat_id: Uuid) -> CoreResult<Chat> {
        let chat = self.find_chat(chat_id).await?;
        require_participant(caller, &participants(&chat), "chat")?;
        Ok(chat)
    }

    /// Appends a message and bumps the thread in one transaction
    ///
    /// # Errors
    ///
    /// - `NotFound` if the chat does not exist
    /// - `Forbidden` unless the caller is a party of the chat
    /// - `ValidationFailure` if the content is JSON null
    pub async fn append_message(
        &self,
        caller: &CallerContext,
        chat_id: Uuid,
        message_type: MessageType,
        content: JsonValue,
    ) -> CoreResult<Message> {
        let chat = self.find_chat(chat_id).await?;
        require_participant(caller, &participants(&chat), "chat")?;

        if content.is_null() {
            return Err(CoreError::validation("message content must not be empty"));
        }

        let now = utc_now();
        let mut tx = self.db.begin().await?;

        // Insert first: the transaction must not start as a reader.
        let message = Message::insert(&mut *tx, chat_id, &caller.user_id, message_type, &content, now)
            .await
            .map_err(|err| match CoreError::from(err) {
                CoreError::ConstraintViolation {
                    kind: ConstraintKind::ForeignKey,
                    ..
                } => CoreError::not_found("chat", chat_id),
                other => other,
            })?;

        let previous = Chat::find_by_id(&mut *tx, chat_id)
            .await?
            .ok_or_else(|| CoreError::not_found("chat", chat_id))?
            .updated_at;

        let bumped = next_activity(previous, now);
        Chat::touch(&mut *tx, chat_id, bumped).await?;

        tx.commit().await?;

        debug!(
            chat_id = %chat_id,
            message_id = %message.id,
            sender_id = %message.sender_id,
            message_type = %message.message_type,
            "Message appended"
        );

        Ok(message)
    }

    /// Threads the user takes part in, most recently active first
    pub async fn list_inbox(&self, user_id: &str) -> CoreResult<Vec<InboxEntry>> {
        Ok(Chat::list_inbox(&self.db, user_id).await?)
    }

    /// Messages of a thread in sending order (parties only)
    pub async fn list_messages(&self, caller: &CallerContext, chat_id: Uuid) -> CoreResult<Vec<Message>> {
        let chat = self.find_chat(chat_id).await?;
        require_participant(caller, &participants(&chat), "chat")?;

        Ok(Message::list_by_chat(&self.db, chat_id).await?)
    }

    /// Deletes a thread and its messages (parties only)
    pub async fn delete_chat(&self, caller: &CallerContext, chat_id: Uuid) -> CoreResult<()> {
        let chat = self.find_chat(chat_id).await?;
        require_participant(caller, &participants(&chat), "chat")?;

        if !Chat::delete(&self.db, chat_id).await? {
            return Err(CoreError::not_found("chat", chat_id));
        }

        info!(chat_id = %chat_id, caller_id = %caller.user_id, "Chat deleted");

        Ok(())
    }

    /// Deletes a message (its sender only)
    pub async fn delete_message(&self, caller: &CallerContext, message_id: Uuid) -> CoreResult<()> {
        let message = Message::find_by_id(&self.db, message_id)
            .await?
            .ok_or_else(|| CoreError::not_found("message", message_id))?;

        require_ownership(caller, &message.sender_id, "message")?;

        if !Message::delete(&self.db, message_id).await? {
            return Err(CoreError::not_found("message", message_id));
        }

        info!(message_id = %message_id, chat_id = %message.chat_id, "Message deleted");

        Ok(())
    }

    async fn find_chat(&self, chat_id: Uuid) -> CoreResult<Chat> {
        Chat::find_by_id(&self.db, chat_id)
            .await?
            .ok_or_else(|| CoreError::not_found("chat", chat_id))
    }
}
