use super::{
    handlers::{
        auth,
        auth::AVATAR_ROUTE_PREFIX,
        comments, follows, health, posts,
        posts::IMAGE_ROUTE_PREFIX,
        replies, search, topics,
    },
    middleware::request_id::request_id_middleware,
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
        .route("/update-psw", post(auth::change_password))
        .route("/edit", post(auth::edit_profile))
        .route("/upload-avatar", post(auth::upload_avatar))
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(posts::list_posts))
        .route("/follow-list", get(posts::follow_feed))
        .route("/user-status", get(posts::user_status))
        .route("/new", post(posts::create_post))
        .route("/upload/img/file", post(posts::upload_image_file))
        .route("/upload/img/url", post(posts::upload_image_url))
        .route("/like", post(posts::like_post))
        .route("/cancel-like", post(posts::cancel_like_post))
        .route("/favourite", post(posts::favourite_post))
        .route("/cancel-favourite", post(posts::cancel_favourite_post))
        .route(
            "/{id}",
            get(posts::get_post).delete(posts::delete_post),
        )
}

fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(comments::list_comments))
        .route("/detail", get(comments::comment_detail))
        .route("/user-status", get(comments::user_status))
        .route("/new", post(comments::create_comment))
        .route("/edit", post(comments::edit_comment))
        .route("/delete", post(comments::delete_comment))
        .route("/like", post(comments::like_comment))
        .route("/cancel-like", post(comments::cancel_like_comment))
        .route("/dislike", post(comments::dislike_comment))
        .route("/cancel-dislike", post(comments::cancel_dislike_comment))
}

fn reply_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(replies::list_replies))
        .route("/detail", get(replies::reply_detail))
        .route("/user-status", get(replies::user_status))
        .route("/new", post(replies::create_reply))
        .route("/edit", post(replies::edit_reply))
        .route("/delete", post(replies::delete_reply))
        .route("/like", post(replies::like_reply))
        .route("/cancel-like", post(replies::cancel_like_reply))
        .route("/dislike", post(replies::dislike_reply))
        .route("/cancel-dislike", post(replies::cancel_dislike_reply))
}

fn topic_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(topics::list_topics))
        .route("/hot", get(topics::hot_topics))
        .route("/detail", get(topics::topic_detail))
        .route("/user-status", get(topics::user_status))
        .route("/new", post(topics::create_topic))
        .route("/delete", post(topics::delete_topic))
        .route("/like", post(topics::like_topic))
        .route("/cancel-like", post(topics::cancel_like_topic))
        .route("/dislike", post(topics::dislike_topic))
        .route("/cancel-dislike", post(topics::cancel_dislike_topic))
}

fn follow_routes() -> Router<AppState> {
    Router::new()
        .route("/new", post(follows::follow))
        .route("/cancel", post(follows::unfollow))
        .route("/status", get(follows::status))
        .route("/following", get(follows::following))
        .route("/followers", get(follows::followers))
        .route("/counts", get(follows::counts))
}

/// Builds the API router; promoted post images are served from `image_dir`
/// and avatars from `avatar_dir`.
pub fn create_router(
    state: AppState,
    image_dir: impl AsRef<Path>,
    avatar_dir: impl AsRef<Path>,
) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/user", user_routes())
        .nest("/api/post", post_routes())
        .nest("/api/comment", comment_routes())
        .nest("/api/reply", reply_routes())
        .nest("/api/topic", topic_routes())
        .nest("/api/follow", follow_routes())
        .route("/api/search/post", get(search::search_posts))
        .nest_service(IMAGE_ROUTE_PREFIX, ServeDir::new(image_dir.as_ref()))
        .nest_service(AVATAR_ROUTE_PREFIX, ServeDir::new(avatar_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
