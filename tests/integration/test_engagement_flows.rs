use super::helpers::{
    AUTH_ERROR, PARAMETER_ERROR, SUCCESS, assert_code, call, create_post, get, ids, post_empty,
    post_json, register_and_login, spawn_app,
};
use microblog_api::domain::engagement::{entity::ReconcileReport, repository::EngagementStore};
use serde_json::json;

#[tokio::test]
async fn liking_a_post_is_idempotent_only_once() {
    let app = spawn_app();
    let (_, author) = register_and_login(&app.app, "author").await;
    let (_, fan) = register_and_login(&app.app, "fan").await;
    let post_id = create_post(&app.app, &author, "hello").await;

    let liked = call(&app.app, post_empty(&format!("/api/post/like?post-id={post_id}"), Some(&fan))).await;
    assert_code(&liked, SUCCESS);

    let again = call(&app.app, post_empty(&format!("/api/post/like?post-id={post_id}"), Some(&fan))).await;
    assert_code(&again, PARAMETER_ERROR);

    let detail = call(&app.app, get(&format!("/api/post/{post_id}"), None)).await;
    assert_eq!(detail["data"]["like_count"], 1);

    // counters written alongside the records leave nothing to repair
    let report = app.state.engagements.reconcile().await.unwrap();
    assert_eq!(report, ReconcileReport::default());

    let status = call(
        &app.app,
        get(&format!("/api/post/user-status?post-id={post_id}"), Some(&fan)),
    )
    .await;
    assert_eq!(status["data"]["liked"], true);
    assert_eq!(status["data"]["favourited"], false);

    let cancelled = call(
        &app.app,
        post_empty(&format!("/api/post/cancel-like?post-id={post_id}"), Some(&fan)),
    )
    .await;
    assert_code(&cancelled, SUCCESS);

    let cancelled_again = call(
        &app.app,
        post_empty(&format!("/api/post/cancel-like?post-id={post_id}"), Some(&fan)),
    )
    .await;
    assert_code(&cancelled_again, PARAMETER_ERROR);

    let detail = call(&app.app, get(&format!("/api/post/{post_id}"), None)).await;
    assert_eq!(detail["data"]["like_count"], 0);
}

#[tokio::test]
async fn engaging_a_missing_post_reports_it_does_not_exist() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "lonely").await;

    let res = call(&app.app, post_empty("/api/post/like?post-id=4242", Some(&token))).await;
    assert_code(&res, PARAMETER_ERROR);
    assert!(
        res["message"].as_str().unwrap().contains("does not exist"),
        "unexpected message: {}",
        res["message"]
    );
}

#[tokio::test]
async fn engagement_requires_a_bearer_token() {
    let app = spawn_app();
    let (_, author) = register_and_login(&app.app, "writer").await;
    let post_id = create_post(&app.app, &author, "guarded").await;

    let anonymous = call(&app.app, post_empty(&format!("/api/post/like?post-id={post_id}"), None)).await;
    assert_code(&anonymous, AUTH_ERROR);

    let forged = call(
        &app.app,
        post_empty(&format!("/api/post/like?post-id={post_id}"), Some("not-a-jwt")),
    )
    .await;
    assert_code(&forged, AUTH_ERROR);
}

#[tokio::test]
async fn comment_like_and_dislike_are_mutually_exclusive() {
    let app = spawn_app();
    let (_, author) = register_and_login(&app.app, "poster").await;
    let (_, critic) = register_and_login(&app.app, "critic").await;
    let post_id = create_post(&app.app, &author, "debate").await;

    let comment = call(
        &app.app,
        post_json(
            "/api/comment/new",
            Some(&author),
            json!({ "post_id": post_id, "content": "first" }),
        ),
    )
    .await;
    assert_code(&comment, SUCCESS);
    let comment_id = comment["data"]["id"].as_i64().unwrap();

    let disliked = call(
        &app.app,
        post_empty(&format!("/api/comment/dislike?comment-id={comment_id}"), Some(&critic)),
    )
    .await;
    assert_code(&disliked, SUCCESS);

    let liked = call(
        &app.app,
        post_empty(&format!("/api/comment/like?comment-id={comment_id}"), Some(&critic)),
    )
    .await;
    assert_code(&liked, SUCCESS);

    let detail = call(&app.app, get(&format!("/api/comment/detail?comment-id={comment_id}"), None)).await;
    assert_eq!(detail["data"]["like_count"], 1);
    assert_eq!(detail["data"]["dislike_count"], 0);

    let status = call(
        &app.app,
        get(&format!("/api/comment/user-status?comment-id={comment_id}"), Some(&critic)),
    )
    .await;
    assert_eq!(status["data"]["liked"], true);
    assert_eq!(status["data"]["disliked"], false);

    let undislike = call(
        &app.app,
        post_empty(
            &format!("/api/comment/cancel-dislike?comment-id={comment_id}"),
            Some(&critic),
        ),
    )
    .await;
    assert_code(&undislike, PARAMETER_ERROR);
}

#[tokio::test]
async fn favourited_list_pages_newest_first() {
    let app = spawn_app();
    let (_, author) = register_and_login(&app.app, "prolific").await;
    let (reader_uid, reader) = register_and_login(&app.app, "reader").await;

    let mut posts = Vec::new();
    for i in 0..3 {
        posts.push(create_post(&app.app, &author, &format!("post {i}")).await);
    }
    for id in &posts {
        let res = call(&app.app, post_empty(&format!("/api/post/favourite?post-id={id}"), Some(&reader))).await;
        assert_code(&res, SUCCESS);
    }

    let first_page = call(
        &app.app,
        get(&format!("/api/post/list?type=favourited&uid={reader_uid}&len=2"), None),
    )
    .await;
    assert_code(&first_page, SUCCESS);
    assert_eq!(ids(&first_page), vec![posts[2], posts[1]]);

    let second_page = call(
        &app.app,
        get(
            &format!("/api/post/list?type=favourited&uid={reader_uid}&len=2&from={}", posts[1]),
            None,
        ),
    )
    .await;
    assert_eq!(ids(&second_page), vec![posts[0]]);
}

#[tokio::test]
async fn following_feeds_posts_and_counts() {
    let app = spawn_app();
    let (star_uid, star) = register_and_login(&app.app, "star").await;
    let (fan_uid, fan) = register_and_login(&app.app, "follower").await;

    let followed = call(
        &app.app,
        post_json("/api/follow/new", Some(&fan), json!({ "user_id": star_uid })),
    )
    .await;
    assert_code(&followed, SUCCESS);

    let self_follow = call(
        &app.app,
        post_json("/api/follow/new", Some(&fan), json!({ "user_id": fan_uid })),
    )
    .await;
    assert_code(&self_follow, PARAMETER_ERROR);

    let post_id = create_post(&app.app, &star, "news").await;
    let feed = call(&app.app, get("/api/post/follow-list", Some(&fan))).await;
    assert_eq!(ids(&feed), vec![post_id]);

    let counts = call(&app.app, get(&format!("/api/follow/counts?user_id={star_uid}"), None)).await;
    assert_eq!(counts["data"]["followers"], 1);
    assert_eq!(counts["data"]["following"], 0);
    let counts = call(&app.app, get(&format!("/api/follow/counts?user_id={fan_uid}"), None)).await;
    assert_eq!(counts["data"]["following"], 1);

    let followers = call(&app.app, get(&format!("/api/follow/followers?user_id={star_uid}"), None)).await;
    assert_eq!(followers["data"]["uids"], json!([fan_uid]));

    let unfollowed = call(
        &app.app,
        post_json("/api/follow/cancel", Some(&fan), json!({ "user_id": star_uid })),
    )
    .await;
    assert_code(&unfollowed, SUCCESS);
    let status = call(&app.app, get(&format!("/api/follow/status?user_id={star_uid}"), Some(&fan))).await;
    assert_eq!(status["data"]["following"], false);
}

#[tokio::test]
async fn topic_votes_flow_through_the_topic_endpoints() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "curator").await;

    let created = call(
        &app.app,
        post_json(
            "/api/topic/new",
            Some(&token),
            json!({ "name": "rust", "description": "crabs" }),
        ),
    )
    .await;
    assert_code(&created, SUCCESS);
    let topic_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(topic_id.len(), 24);

    let liked = call(
        &app.app,
        post_json("/api/topic/like", Some(&token), json!({ "topic_id": topic_id })),
    )
    .await;
    assert_code(&liked, SUCCESS);

    let detail = call(&app.app, get(&format!("/api/topic/detail?topic_id={topic_id}"), None)).await;
    assert_eq!(detail["data"]["like_count"], 1);
    assert_eq!(detail["data"]["post_count"], 0);

    let hot = call(&app.app, get("/api/topic/hot", None)).await;
    assert_eq!(hot["data"]["topics"][0]["id"], topic_id.as_str());

    let bad_id = call(
        &app.app,
        post_json("/api/topic/like", Some(&token), json!({ "topic_id": "xyz" })),
    )
    .await;
    assert_code(&bad_id, PARAMETER_ERROR);
}
