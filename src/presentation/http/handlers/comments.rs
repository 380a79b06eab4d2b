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
    domain::{comment::entity::Comment, shared::ids::ActorId},
    presentation::http::{
        errors::AppError,
        middleware::user::require_user,
        response::{ApiResponse, IdList},
        state::AppState,
    },
};

#[derive(Debug, Deserialize)]
pub struct PostIdQuery {
    #[serde(rename = "post-id")]
    pub post_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommentIdQuery {
    #[serde(rename = "comment-id")]
    pub comment_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditCommentRequest {
    pub comment_id: i64,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentRequest {
    pub comment_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentUserStatus {
    pub comment_id: i64,
    pub uid: ActorId,
    pub liked: bool,
    pub disliked: bool,
}

/// Comment ids under a post, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<ApiResponse<IdList>, AppError> {
    let Query(query) = query?;
    let ids = state.comments.list(query.post_id).await?;
    Ok(ApiResponse::success(IdList { ids }))
}

pub async fn comment_detail(
    State(state): State<AppState>,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<Comment>, AppError> {
    let Query(query) = query?;
    Ok(ApiResponse::success(
        state.comments.detail(query.comment_id).await?,
    ))
}

pub async fn user_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<CommentUserStatus>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    let status = state.comments.user_status(user.uid, query.comment_id).await?;
    Ok(ApiResponse::success(CommentUserStatus {
        comment_id: query.comment_id,
        uid: user.uid,
        liked: status.liked,
        disliked: status.disliked,
    }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<ApiResponse<Comment>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;
    let comment = state
        .comments
        .create(user.uid, &user.username, body.post_id, &body.content)
        .await?;
    Ok(ApiResponse::success(comment))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EditCommentRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;
    state
        .comments
        .edit(user.uid, body.comment_id, &body.content)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DeleteCommentRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state.comments.delete(user.uid, body.comment_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn like_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.comments.like(user.uid, query.comment_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_like_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.comments.unlike(user.uid, query.comment_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn dislike_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.comments.dislike(user.uid, query.comment_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_dislike_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CommentIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.comments.undislike(user.uid, query.comment_id).await?;
    Ok(ApiResponse::ok())
}
