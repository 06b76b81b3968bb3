//! Chat Store Implementation
//!
//! PostgreSQL implementation of the chat store: chats, messages and the user
//! display records used for presence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::store::total_pages;
use crate::domain::{Chat, ChatStore, Message, MessageKind, NewChat, NewMessage, UserDisplay};
use crate::shared::error::AppError;

/// PostgreSQL chat store.
///
/// Ids are assigned here as UUIDv7 strings so they sort by creation time.
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    /// Creates a new PgChatStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for chat queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: String,
    users: Vec<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    count_messages: i64,
    last_message: Option<String>,
    last_message_id: Option<String>,
    last_message_by: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
}

impl ChatRow {
    fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            users: self.users,
            created_by: self.created_by,
            created_at: self.created_at,
            count_messages: self.count_messages,
            last_message: self.last_message,
            last_message_id: self.last_message_id,
            last_message_by: self.last_message_by,
            last_message_at: self.last_message_at,
        }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    chat_id: String,
    sender: String,
    content: String,
    sent_at: DateTime<Utc>,
    kind: String,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender: self.sender,
            content: self.content,
            sent_at: self.sent_at,
            kind: MessageKind::from_str(&self.kind),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
}

const CHAT_COLUMNS: &str = r#"
    id, users, created_by, created_at, count_messages,
    last_message, last_message_id, last_message_by, last_message_at
"#;

#[async_trait]
impl ChatStore for PgChatStore {
    async fn find_chat(&self, id: &str) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ChatRow::into_chat))
    }

    async fn find_chat_by_participants(
        &self,
        participants: &[String],
    ) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE users @> $1 LIMIT 1"
        ))
        .bind(participants)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ChatRow::into_chat))
    }

    async fn list_chats_for(&self, user_id: &str) -> Result<Vec<Chat>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(&format!(
            r#"
            SELECT {CHAT_COLUMNS} FROM chats
            WHERE $1 = ANY(users)
            ORDER BY COALESCE(last_message_at, created_at) DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatRow::into_chat).collect())
    }

    async fn create_chat(&self, chat: &NewChat) -> Result<Chat, AppError> {
        let id = Uuid::now_v7().to_string();

        sqlx::query(
            r#"
            INSERT INTO chats (id, users, created_by, created_at, count_messages)
            VALUES ($1, $2, $3, $4, 0)
            "#,
        )
        .bind(&id)
        .bind(&chat.users)
        .bind(&chat.created_by)
        .bind(chat.created_at)
        .execute(&self.pool)
        .await?;

        Ok(chat.clone().into_chat(id))
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET last_message = $2,
                last_message_id = $3,
                last_message_by = $4,
                last_message_at = $5,
                count_messages = $6
            WHERE id = $1
            "#,
        )
        .bind(&chat.id)
        .bind(&chat.last_message)
        .bind(&chat.last_message_id)
        .bind(&chat.last_message_by)
        .bind(chat.last_message_at)
        .bind(chat.count_messages)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Chat {} not found", chat.id)));
        }

        Ok(())
    }

    async fn save_message(&self, message: &NewMessage) -> Result<Message, AppError> {
        let id = Uuid::now_v7().to_string();

        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, sender, content, sent_at, kind)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&id)
        .bind(&message.chat_id)
        .bind(&message.sender)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(message.clone().into_message(id))
    }

    async fn list_messages(
        &self,
        chat_id: &str,
        limit: u32,
        page: u32,
    ) -> Result<(Vec<Message>, u64), AppError> {
        let limit = limit.max(1);
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender, content, sent_at, kind
            FROM messages
            WHERE chat_id = $1
            ORDER BY sent_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(chat_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let messages = rows.into_iter().map(MessageRow::into_message).collect();
        Ok((messages, total_pages(total.max(0) as u64, limit)))
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserDisplay>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| UserDisplay::new(r.id, r.username)))
    }

    async fn resolve_users(&self, ids: &[String]) -> Result<Vec<UserDisplay>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username FROM users WHERE id = ANY($1) ORDER BY username",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserDisplay::new(r.id, r.username))
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
