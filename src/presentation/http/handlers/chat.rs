//! Chat Handlers

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::{
    ChatResponse, CreateChatRequest, HistoryQuery, MessagePageResponse, OnlineUsersResponse,
};
use crate::application::services::{ChatService, ChatServiceImpl};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn chat_service(state: &AppState) -> ChatServiceImpl {
    ChatServiceImpl::new(state.store.clone())
}

/// List the caller's chats
pub async fn list_chats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ChatResponse>>, AppError> {
    let chats = chat_service(&state).list_chats(&auth.user_id).await?;
    Ok(Json(chats))
}

/// Get one chat by ID
pub async fn get_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat = chat_service(&state).get_chat(&auth.user_id, &chat_id).await?;
    Ok(Json(chat))
}

/// Open a direct chat with another user
///
/// Returns 201 for a new chat, 200 if the pair already had one.
pub async fn create_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (chat, created) = chat_service(&state)
        .create_chat(&auth.user_id, &body.user_id)
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(chat)))
}

/// Page through a chat's history
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(chat_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<MessagePageResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let page = chat_service(&state)
        .history(&auth.user_id, &chat_id, query.limit, query.page)
        .await?;
    Ok(Json(page))
}

/// Users currently online, excluding the caller
pub async fn online_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<OnlineUsersResponse>, AppError> {
    let online = state.gateway.registry().all_users();
    let online_users = chat_service(&state)
        .online_users(&auth.user_id, online)
        .await?;
    Ok(Json(OnlineUsersResponse { online_users }))
}
