use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    domain::{
        shared::ids::ActorId,
        user::entity::{ProfileUpdate, User},
    },
    presentation::http::{
        errors::AppError,
        middleware::user::require_user,
        response::ApiResponse,
        state::AppState,
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

pub const AVATAR_ROUTE_PREFIX: &str = "/resources/avatar";

/// Public shape of an account; the avatar is exposed as its served path.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: ActorId,
    pub username: String,
    pub nickname: String,
    pub birth: Option<i64>,
    pub gender: String,
    pub avatar: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn avatar_path(filename: &str) -> String {
    format!("{AVATAR_ROUTE_PREFIX}/{filename}")
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            avatar: avatar_path(&u.avatar),
            username: u.username,
            nickname: u.nickname,
            birth: u.birth,
            gender: u.gender,
            follower_count: u.follower_count,
            following_count: u.following_count,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "new_password is required"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct EditProfileRequest {
    pub nickname: Option<String>,
    pub birth: Option<i64>,
    pub gender: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub uid: ActorId,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub uid: Option<ActorId>,
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<ApiResponse<RegisterResponse>, AppError> {
    let Json(body) = body?;
    body.validate()?;
    let user = state.users.register(&body.username, &body.password).await?;
    Ok(ApiResponse::success(RegisterResponse { uid: user.id }))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let Json(body) = body?;
    body.validate()?;
    let result = state.users.login(&body.username, &body.password).await?;
    Ok(ApiResponse::success(LoginResponse {
        token: result.token,
        user: result.user.into(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ApiResponse<()>, AppError> {
    let user = require_user(&state, &headers).await?;
    state.users.logout(user.uid, &user.token).await?;
    Ok(ApiResponse::ok())
}

/// Profile of `uid`, or of the caller when `uid` is omitted.
pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ProfileQuery>, QueryRejection>,
) -> Result<ApiResponse<UserView>, AppError> {
    let Query(query) = query?;
    let uid = match query.uid {
        Some(uid) => uid,
        None => require_user(&state, &headers).await?.uid,
    };
    Ok(ApiResponse::success(state.users.profile(uid).await?.into()))
}

/// Needs the current credentials rather than a session; every session of
/// the account is revoked on success.
pub async fn change_password(
    State(state): State<AppState>,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Json(body) = body?;
    body.validate()?;
    state
        .users
        .change_password(&body.username, &body.password, &body.new_password)
        .await?;
    Ok(ApiResponse::ok())
}

pub async fn edit_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EditProfileRequest>, JsonRejection>,
) -> Result<ApiResponse<UserView>, AppError> {
    let user = require_user(&state, &headers).await?;
    let Json(body) = body?;
    let updated = state
        .users
        .update_profile(
            user.uid,
            ProfileUpdate {
                nickname: body.nickname,
                birth: body.birth,
                gender: body.gender,
            },
        )
        .await?;
    Ok(ApiResponse::success(updated.into()))
}

/// Replaces the caller's avatar with the multipart `file` field.
pub async fn upload_avatar(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<AvatarResponse>, AppError> {
    let user = require_user(&state, &headers).await?;
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
        let filename = state.users.upload_avatar(user.uid, data).await?;
        return Ok(ApiResponse::success(AvatarResponse {
            avatar: avatar_path(&filename),
        }));
    }
    Err(AppError::BadRequest("file is required".to_string()))
}
