use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_topic_id;
use crate::{
    application::posts::dto::{CreatePostCommand, PostListKind, PostListQuery},
    domain::{
        engagement::entity::EngagementStatus,
        post::entity::Post,
        shared::{
            ids::{ActorId, TopicId},
            pagination::CursorPage,
        },
    },
    presentation::http::{
        errors::AppError,
        middleware::user::{optional_user, require_user},
        response::{ApiResponse, IdList},
        state::AppState,
    },
};

pub const IMAGE_ROUTE_PREFIX: &str = "/resources/image";

/// Public shape of a post; the author's address stays server-side.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub uid: ActorId,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub topic_id: Option<TopicId>,
    pub like_count: i64,
    pub favourite_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            uid: p.author_id,
            title: p.title,
            content: p.content,
            images: p
                .images
                .iter()
                .map(|name| format!("{IMAGE_ROUTE_PREFIX}/{name}"))
                .collect(),
            topic_id: p.topic_id,
            like_count: p.like_count,
            favourite_count: p.favourite_count,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostListParams {
    #[serde(rename = "type", default)]
    pub kind: PostListKind,
    pub uid: Option<ActorId>,
    pub topic_id: Option<String>,
    pub from: Option<i64>,
    pub len: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub from: Option<i64>,
    pub len: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PostIdQuery {
    #[serde(rename = "post-id")]
    pub post_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 9, message = "a post can carry at most 9 images"))]
    pub images: Vec<String>,
    pub topic_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImageUrlRequest {
    #[validate(url(message = "url is invalid"))]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct StagedImage {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PostUserStatus {
    pub post_id: i64,
    pub uid: ActorId,
    pub liked: bool,
    pub favourited: bool,
}

impl PostUserStatus {
    fn new(post_id: i64, uid: ActorId, status: EngagementStatus) -> Self {
        Self {
            post_id,
            uid,
            liked: status.liked,
            favourited: status.favourited,
        }
    }
}

/// Client address as reported by the fronting proxy.
fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .map(str::to_string)
}

pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PostListParams>, QueryRejection>,
) -> Result<ApiResponse<IdList>, AppError> {
    let Query(params) = query?;
    let topic_id = params
        .topic_id
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(parse_topic_id)
        .transpose()?;
    let viewer = optional_user(&state, &headers).await.map(|u| u.uid);

    let ids = state
        .posts
        .list(
            viewer,
            PostListQuery {
                kind: params.kind,
                uid: params.uid,
                topic_id,
                page: CursorPage::new(params.from, params.len),
            },
        )
        .await?;
    Ok(ApiResponse::success(IdList { ids }))
}

pub async fn follow_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<ApiResponse<IdList>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(params) = query?;
    let ids = state
        .posts
        .follow_feed(user.uid, CursorPage::new(params.from, params.len))
        .await?;
    Ok(ApiResponse::success(IdList { ids }))
}

pub async fn get_post(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<PostView>, AppError> {
    let Path(id) = id?;
    let post = state.posts.detail(id).await?;
    Ok(ApiResponse::success(post.into()))
}

pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<ApiResponse<PostView>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;

    let topic_id = body
        .topic_id
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(parse_topic_id)
        .transpose()?;
    let post = state
        .posts
        .create(
            user.uid,
            extract_client_ip(&headers),
            CreatePostCommand {
                title: body.title,
                content: body.content,
                images: body.images,
                topic_id,
            },
        )
        .await?;
    Ok(ApiResponse::success(post.into()))
}

pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Path(id) = id?;
    state.posts.delete(user.uid, id).await?;
    Ok(ApiResponse::ok())
}

pub async fn user_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<ApiResponse<PostUserStatus>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    let status = state.posts.user_status(user.uid, query.post_id).await?;
    Ok(ApiResponse::success(PostUserStatus::new(
        query.post_id,
        user.uid,
        status,
    )))
}

pub async fn like_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.posts.like(user.uid, query.post_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_like_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.posts.unlike(user.uid, query.post_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn favourite_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.posts.favourite(user.uid, query.post_id).await?;
    Ok(ApiResponse::ok())
}

pub async fn cancel_favourite_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Query(query) = query?;
    state.posts.unfavourite(user.uid, query.post_id).await?;
    Ok(ApiResponse::ok())
}

/// Stages the multipart `file` field as a post image.
pub async fn upload_image_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<StagedImage>, AppError> {
    require_user(&state, &headers).await?;
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let token = state.posts.stage_upload(data).await?;
        return Ok(ApiResponse::success(StagedImage { token }));
    }
    Err(AppError::BadRequest("file is required".to_string()))
}

pub async fn upload_image_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ImageUrlRequest>, JsonRejection>,
) -> Result<ApiResponse<StagedImage>, AppError> {
    require_user(&state, &headers).await?;
    let Json(body) = body?;
    body.validate()?;
    let token = state.posts.stage_from_url(&body.url).await?;
    Ok(ApiResponse::success(StagedImage { token }))
}
