use rusqlite::params;
use serde::Serialize;

use crate::db::models::ChatMessage;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub message_count: i64,
    pub last_message_at: String,
    pub preview: Option<String>,
}

pub fn insert_message(
    pool: &DbPool,
    user_id: &str,
    conversation_id: &str,
    role: &str,
    content: &str,
    metadata: Option<&serde_json::Value>,
) -> AppResult<ChatMessage> {
    let id = uuid::Uuid::now_v7().to_string();
    let metadata = metadata.map(serde_json::to_string).transpose()?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO chat_messages (id, role, content, conversation_id, metadata, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, role, content, conversation_id, metadata, user_id],
    )?;

    let message = conn.query_row(
        &format!(
            "SELECT {} FROM chat_messages WHERE id = ?1",
            ChatMessage::COLUMNS
        ),
        params![id],
        ChatMessage::from_row,
    )?;
    Ok(message)
}

/// All messages of a conversation owned by `user_id`, oldest first.
pub fn conversation_history(
    pool: &DbPool,
    user_id: &str,
    conversation_id: &str,
) -> AppResult<Vec<ChatMessage>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM chat_messages
         WHERE user_id = ?1 AND conversation_id = ?2
         ORDER BY created_at ASC, rowid ASC",
        ChatMessage::COLUMNS
    ))?;

    let messages = stmt
        .query_map(params![user_id, conversation_id], ChatMessage::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

/// The newest `limit` messages of a conversation, returned oldest first.
pub fn recent_messages(
    pool: &DbPool,
    user_id: &str,
    conversation_id: &str,
    limit: usize,
) -> AppResult<Vec<ChatMessage>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM chat_messages
         WHERE user_id = ?1 AND conversation_id = ?2
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?3",
        ChatMessage::COLUMNS
    ))?;

    let mut messages = stmt
        .query_map(
            params![user_id, conversation_id, limit as i64],
            ChatMessage::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    messages.reverse();
    Ok(messages)
}

pub fn list_conversations(pool: &DbPool, user_id: &str) -> AppResult<Vec<ConversationSummary>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT m.conversation_id,
                COUNT(*) AS message_count,
                MAX(m.created_at) AS last_message_at,
                (SELECT f.content FROM chat_messages f
                  WHERE f.user_id = m.user_id
                    AND f.conversation_id = m.conversation_id
                    AND f.role = 'user'
                  ORDER BY f.created_at ASC, f.rowid ASC
                  LIMIT 1) AS first_question,
                MAX(m.rowid) AS last_rowid
         FROM chat_messages m
         WHERE m.user_id = ?1
         GROUP BY m.conversation_id
         ORDER BY last_message_at DESC, last_rowid DESC",
    )?;

    let summaries = stmt
        .query_map(params![user_id], |row| {
            let first: Option<String> = row.get(3)?;
            Ok(ConversationSummary {
                conversation_id: row.get(0)?,
                message_count: row.get(1)?,
                last_message_at: row.get(2)?,
                preview: first.map(|q| preview(&q)),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

/// Delete a conversation's rows owned by `user_id`. NotFound when there were none.
pub fn delete_conversation(pool: &DbPool, user_id: &str, conversation_id: &str) -> AppResult<usize> {
    let conn = pool.get()?;
    let deleted = conn.execute(
        "DELETE FROM chat_messages WHERE user_id = ?1 AND conversation_id = ?2",
        params![user_id, conversation_id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(deleted)
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    cut.push('…');
    cut
}
