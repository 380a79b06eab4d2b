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

use super::parse_topic_id;
use crate::{
    domain::{
        shared::ids::{ActorId, TopicId},
        topic::entity::Topic,
    },
    presentation::http::{
        errors::AppError,
        middleware::user::require_user,
        response::ApiResponse,
        state::AppState,
    },
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TopicIdParam {
    pub topic_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct TopicList {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Serialize)]
pub struct TopicDetailView {
    #[serde(flatten)]
    pub topic: Topic,
    pub post_count: i64,
}

#[derive(Debug, Serialize)]
pub struct TopicUserStatus {
    pub topic_id: TopicId,
    pub uid: ActorId,
    pub liked: bool,
    pub disliked: bool,
}

pub async fn list_topics(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<ApiResponse<TopicList>, AppError> {
    let Query(query) = query?;
    let topics = state.topics.list(query.limit).await?;
    Ok(ApiResponse::success(TopicList { topics }))
}

pub async fn hot_topics(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<ApiResponse<TopicList>, AppError> {
    let Query(query) = query?;
    let topics = state.topics.hot(query.limit).await?;
    Ok(ApiResponse::success(TopicList { topics }))
}

pub async fn topic_detail(
    State(state): State<AppState>,
    query: Result<Query<TopicIdParam>, QueryRejection>,
) -> Result<ApiResponse<TopicDetailView>, AppError> {
    let Query(query) = query?;
    let detail = state.topics.detail(parse_topic_id(&query.topic_id)?).await?;
    Ok(ApiResponse::success(TopicDetailView {
        topic: detail.topic,
        post_count: detail.post_count,
    }))
}

pub async fn user_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TopicIdParam>, QueryRejection>,
) -> Result<ApiResponse<TopicUserStatus>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    let topic_id = parse_topic_id(&query.topic_id)?;
    let status = state.topics.user_status(user.uid, topic_id).await?;
    Ok(ApiResponse::success(TopicUserStatus {
        topic_id,
        uid: user.uid,
        liked: status.liked,
        disliked: status.disliked,
    }))
}

pub async fn create_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Result<ApiResponse<Topic>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;
    let topic = state
        .topics
        .create(user.uid, &body.name, &body.description)
        .await?;
    Ok(ApiResponse::success(topic))
}

pub async fn delete_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TopicIdParam>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state
        .topics
        .delete(user.uid, parse_topic_id(&body.topic_id)?)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn like_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TopicIdParam>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state
        .topics
        .like(user.uid, parse_topic_id(&body.topic_id)?)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_like_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TopicIdParam>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state
        .topics
        .unlike(user.uid, parse_topic_id(&body.topic_id)?)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn dislike_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TopicIdParam>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state
        .topics
        .dislike(user.uid, parse_topic_id(&body.topic_id)?)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_dislike_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TopicIdParam>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    state
        .topics
        .undislike(user.uid, parse_topic_id(&body.topic_id)?)
        .await?;
    Ok(ApiResponse::ok())
}
