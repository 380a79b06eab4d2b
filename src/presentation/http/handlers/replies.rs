use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    domain::{reply::entity::Reply, shared::ids::ActorId},
    presentation::http::{
        errors::AppError,
        middleware::user::require_user,
        response::{ApiResponse, IdList},
        state::AppState,
    },
};

#[derive(Debug, Deserialize)]
pub struct CommentIdQuery {
    #[serde(rename = "comment-id")]
    pub comment_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReplyIdQuery {
    #[serde(rename = "reply-id")]
    pub reply_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReplyRequest {
    pub comment_id: i64,
    /// `0` and absent both mean a top-level reply.
    pub parent_reply_id: Option<i64>,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditReplyRequest {
    pub reply_id: i64,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteReplyRequest {
    pub reply_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ReplyUserStatus {
    pub reply_id: i64,
    pub uid: ActorId,
    pub liked: bool,
    pub disliked: bool,
}

/// Reply ids under a comment, oldest first.
pub async fn list_replies(
    State(state): State<AppState>,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<IdList>, AppError> {
    let Query(query) = query?;
    let ids = state.replies.list(query.comment_id).await?;
    Ok(ApiResponse::success(IdList { ids }))
}

pub async fn reply_detail(
    State(state): State<AppState>,
    query: Result<Query<ReplyIdQuery>, QueryRejection>,
) -> Result<ApiResponse<Reply>, AppError> {
    let Query(query) = query?;
    Ok(ApiResponse::success(state.replies.detail(query.reply_id).await?))
}

pub async fn user_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ReplyIdQuery>, QueryRejection>,
) -> Result<ApiResponse<ReplyUserStatus>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    let status = state.replies.user_status(user.uid, query.reply_id).await?;
    Ok(ApiResponse::success(ReplyUserStatus {
        reply_id: query.reply_id,
        uid: user.uid,
        liked: status.liked,
        disliked: status.disliked,
    }))
}

pub async fn create_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateReplyRequest>, JsonRejection>,
) -> Result<ApiResponse<Reply>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;
    let parent = body.parent_reply_id.filter(|id| *id > 0);
    let reply = state
        .replies
        .create(user.uid, &user.username, body.comment_id, parent, &body.content)
        .await?;
    Ok(ApiResponse::success(reply))
}

pub async fn edit_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EditReplyRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;
    state
        .replies
        .edit(user.uid, body.reply_id, &body.content)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn delete_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DeleteReplyRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state.replies.delete(user.uid, body.reply_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn like_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ReplyIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.replies.like(user.uid, query.reply_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_like_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ReplyIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.replies.unlike(user.uid, query.reply_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn dislike_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ReplyIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.replies.dislike(user.uid, query.reply_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_dislike_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ReplyIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.replies.undislike(user.uid, query.reply_id).await?;
    Ok(ApiResponse::ok())
}
