use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::chat::formatter;
use crate::chat::history;
use crate::chat::llm::PromptMessage;
use crate::chat::repository::{self, ConversationSummary};
use crate::db::models::ChatMessage;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
const ROLE_SYSTEM: &str = "system";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub conversation_id: String,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

/// POST /chat/message
///
/// Persists the user turn, asks the model, then persists the reply. The steps are
/// not transactional: if the model call fails the user message stays stored.
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<SendMessageResponse>> {
    let text = req.message.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message is required".into()));
    }
    if text.chars().count() > state.config.chat.max_message_len {
        return Err(AppError::BadRequest(format!(
            "Message exceeds {} characters",
            state.config.chat.max_message_len
        )));
    }

    let conversation_id = match req.conversation_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::now_v7().to_string(),
    };

    let user_message =
        repository::insert_message(&state.db, &user.id, &conversation_id, ROLE_USER, text, None)?;
    let user_turn = PromptMessage::new(ROLE_USER, text);

    let cached = {
        let cache = state.conversations.lock().await;
        cache.get(&user.id, &conversation_id)
    };
    let cache_hit = cached.is_some();

    let mut context = match cached {
        Some(mut turns) => {
            turns.push(user_turn.clone());
            turns
        }
        // The freshly stored user message is part of this window
        None => repository::recent_messages(
            &state.db,
            &user.id,
            &conversation_id,
            state.config.chat.history_limit,
        )?
        .into_iter()
        .map(|m| PromptMessage::new(m.role, m.content))
        .collect(),
    };
    let overflow = context.len().saturating_sub(state.config.chat.history_limit);
    context.drain(..overflow);

    let mut prompt = Vec::with_capacity(context.len() + 1);
    prompt.push(PromptMessage::new(ROLE_SYSTEM, &state.config.llm.system_prompt));
    prompt.extend(context.iter().cloned());

    let completion = state.llm.complete(&prompt).await.map_err(|e| {
        tracing::warn!(
            "Chat completion failed for conversation {}: {}",
            conversation_id,
            e
        );
        AppError::Upstream(e.to_string())
    })?;

    let formatted = formatter::format_code_blocks(&completion.content);
    let metadata = serde_json::json!({
        "model": completion.model,
        "mock": completion.mock,
        "codeBlocksRepaired": formatted.repaired,
    });

    let assistant_message = repository::insert_message(
        &state.db,
        &user.id,
        &conversation_id,
        ROLE_ASSISTANT,
        &formatted.text,
        Some(&metadata),
    )?;
    let assistant_turn = PromptMessage::new(ROLE_ASSISTANT, formatted.text);

    {
        let mut cache = state.conversations.lock().await;
        let now = history::now();
        if cache_hit {
            cache.append(&user.id, &conversation_id, [user_turn, assistant_turn], now);
        } else {
            context.push(assistant_turn);
            cache.append(&user.id, &conversation_id, context, now);
        }
    }

    Ok(Json(SendMessageResponse {
        conversation_id,
        user_message,
        assistant_message,
    }))
}

/// GET /chat/history/{conversation_id}
pub async fn get_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(conversation_id): Path<String>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let messages = repository::conversation_history(&state.db, &user.id, &conversation_id)?;
    if messages.is_empty() {
        return Err(AppError::NotFound);
    }
    Ok(Json(messages))
}

/// GET /chat/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    Ok(Json(repository::list_conversations(&state.db, &user.id)?))
}

/// DELETE /chat/history/{conversation_id}
pub async fn delete_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(conversation_id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = repository::delete_conversation(&state.db, &user.id, &conversation_id)?;
    state
        .conversations
        .lock()
        .await
        .remove(&user.id, &conversation_id);

    tracing::info!(
        "Deleted conversation {} ({} messages) for user {}",
        conversation_id,
        deleted,
        user.id
    );
    Ok(StatusCode::NO_CONTENT)
}
