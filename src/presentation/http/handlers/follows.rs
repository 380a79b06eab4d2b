use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::follows::dto::FollowCounts,
    domain::shared::ids::ActorId,
    presentation::http::{
        errors::AppError,
        middleware::user::require_user,
        response::ApiResponse,
        state::AppState,
    },
};

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub user_id: ActorId,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: ActorId,
}

#[derive(Debug, Serialize)]
pub struct FollowStatus {
    pub user_id: ActorId,
    pub following: bool,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub uids: Vec<ActorId>,
}

pub async fn follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FollowRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state.follows.follow(user.uid, body.user_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn unfollow(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FollowRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state.follows.unfollow(user.uid, body.user_id).await?;
    Ok(ApiResponse::ok())
}

/// Whether the caller follows `user_id`.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<ApiResponse<FollowStatus>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    let following = state.follows.is_following(user.uid, query.user_id).await?;
    Ok(ApiResponse::success(FollowStatus {
        user_id: query.user_id,
        following,
    }))
}

pub async fn following(
    State(state): State<AppState>,
    query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<ApiResponse<UserList>, AppError> {
    let Query(query) = query?;
    let uids = state.follows.following(query.user_id).await?;
    Ok(ApiResponse::success(UserList { uids }))
}

pub async fn followers(
    State(state): State<AppState>,
    query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<ApiResponse<UserList>, AppError> {
    let Query(query) = query?;
    let uids = state.follows.followers(query.user_id).await?;
    Ok(ApiResponse::success(UserList { uids }))
}

pub async fn counts(
    State(state): State<AppState>,
    query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<ApiResponse<FollowCounts>, AppError> {
    let Query(query) = query?;
    Ok(ApiResponse::success(
        state.follows.counts(query.user_id).await?,
    ))
}
