use super::helpers::{
    AUTH_ERROR, PARAMETER_ERROR, SUCCESS, assert_code, call, create_post, delete, get, ids,
    post_empty, post_json, register_and_login, spawn_app,
};
use serde_json::json;

#[tokio::test]
async fn health_reports_in_memory_mode() {
    let app = spawn_app();
    let res = super::helpers::send(&app.app, get("/health", None)).await;
    assert_eq!(res.status(), axum::http::StatusCode::OK);
    let body = super::helpers::read_json(res).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "disabled");
}

#[tokio::test]
async fn registration_rejects_duplicate_usernames_and_bad_passwords() {
    let app = spawn_app();
    register_and_login(&app.app, "alice").await;

    let duplicate = call(
        &app.app,
        post_json(
            "/api/user/register",
            None,
            json!({ "username": "alice", "password": "another-password" }),
        ),
    )
    .await;
    assert_code(&duplicate, PARAMETER_ERROR);

    let wrong_password = call(
        &app.app,
        post_json(
            "/api/user/login",
            None,
            json!({ "username": "alice", "password": "definitely-wrong" }),
        ),
    )
    .await;
    assert_code(&wrong_password, PARAMETER_ERROR);
    assert!(wrong_password["data"].is_null());
}

#[tokio::test]
async fn malformed_bodies_are_parameter_errors() {
    let app = spawn_app();
    let res = call(
        &app.app,
        post_json("/api/user/register", None, json!({ "username": "bob" })),
    )
    .await;
    assert_code(&res, PARAMETER_ERROR);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = spawn_app();
    let (uid, token) = register_and_login(&app.app, "leaver").await;

    let profile = call(&app.app, get("/api/user/profile", Some(&token))).await;
    assert_code(&profile, SUCCESS);
    assert_eq!(profile["data"]["id"], uid);
    assert!(profile["data"].get("password_hash").is_none());

    let logout = call(&app.app, post_empty("/api/user/logout", Some(&token))).await;
    assert_code(&logout, SUCCESS);

    let after = call(&app.app, get("/api/user/profile", Some(&token))).await;
    assert_code(&after, AUTH_ERROR);

    let public = call(&app.app, get(&format!("/api/user/profile?uid={uid}"), None)).await;
    assert_code(&public, SUCCESS);
    assert_eq!(public["data"]["username"], "leaver");
}

#[tokio::test]
async fn only_the_author_may_delete_a_post() {
    let app = spawn_app();
    let (_, author) = register_and_login(&app.app, "owner").await;
    let (_, other) = register_and_login(&app.app, "intruder").await;
    let post_id = create_post(&app.app, &author, "mine").await;

    let denied = call(&app.app, delete(&format!("/api/post/{post_id}"), Some(&other))).await;
    assert_code(&denied, AUTH_ERROR);

    let deleted = call(&app.app, delete(&format!("/api/post/{post_id}"), Some(&author))).await;
    assert_code(&deleted, SUCCESS);

    let gone = call(&app.app, get(&format!("/api/post/{post_id}"), None)).await;
    assert_code(&gone, PARAMETER_ERROR);
}

#[tokio::test]
async fn deleting_a_post_removes_its_thread_and_engagements() {
    let app = spawn_app();
    let (_, author) = register_and_login(&app.app, "threadop").await;
    let (fan_uid, fan) = register_and_login(&app.app, "threadfan").await;
    let post_id = create_post(&app.app, &author, "thread").await;

    let comment = call(
        &app.app,
        post_json("/api/comment/new", Some(&fan), json!({ "post_id": post_id, "content": "nice" })),
    )
    .await;
    let comment_id = comment["data"]["id"].as_i64().unwrap();
    call(&app.app, post_empty(&format!("/api/post/like?post-id={post_id}"), Some(&fan))).await;

    let liked = call(
        &app.app,
        get(&format!("/api/post/list?type=liked&uid={fan_uid}"), None),
    )
    .await;
    assert_eq!(ids(&liked), vec![post_id]);

    let deleted = call(&app.app, delete(&format!("/api/post/{post_id}"), Some(&author))).await;
    assert_code(&deleted, SUCCESS);

    let comment_gone = call(
        &app.app,
        get(&format!("/api/comment/detail?comment-id={comment_id}"), None),
    )
    .await;
    assert_code(&comment_gone, PARAMETER_ERROR);

    let liked = call(
        &app.app,
        get(&format!("/api/post/list?type=liked&uid={fan_uid}"), None),
    )
    .await;
    assert!(ids(&liked).is_empty());
}

#[tokio::test]
async fn replies_thread_under_comments_oldest_first() {
    let app = spawn_app();
    let (author_uid, author) = register_and_login(&app.app, "opener").await;
    let (_, replier) = register_and_login(&app.app, "replier").await;
    let post_id = create_post(&app.app, &author, "discuss").await;

    let comment = call(
        &app.app,
        post_json("/api/comment/new", Some(&author), json!({ "post_id": post_id, "content": "topic" })),
    )
    .await;
    let comment_id = comment["data"]["id"].as_i64().unwrap();

    let first = call(
        &app.app,
        post_json(
            "/api/reply/new",
            Some(&author),
            json!({ "comment_id": comment_id, "parent_reply_id": 0, "content": "context" }),
        ),
    )
    .await;
    assert_code(&first, SUCCESS);
    let first_id = first["data"]["id"].as_i64().unwrap();
    assert!(first["data"]["parent_reply_id"].is_null());

    let second = call(
        &app.app,
        post_json(
            "/api/reply/new",
            Some(&replier),
            json!({ "comment_id": comment_id, "parent_reply_id": first_id, "content": "agreed" }),
        ),
    )
    .await;
    assert_code(&second, SUCCESS);
    let second_id = second["data"]["id"].as_i64().unwrap();
    assert_eq!(second["data"]["parent_reply_uid"], author_uid);
    assert_eq!(second["data"]["username"], "replier");

    let listed = call(&app.app, get(&format!("/api/reply/list?comment-id={comment_id}"), None)).await;
    assert_eq!(ids(&listed), vec![first_id, second_id]);

    let hijack = call(
        &app.app,
        post_json(
            "/api/reply/edit",
            Some(&replier),
            json!({ "reply_id": first_id, "content": "rewritten" }),
        ),
    )
    .await;
    assert_code(&hijack, AUTH_ERROR);

    let edited = call(
        &app.app,
        post_json(
            "/api/reply/edit",
            Some(&replier),
            json!({ "reply_id": second_id, "content": "strongly agreed" }),
        ),
    )
    .await;
    assert_code(&edited, SUCCESS);
    let detail = call(&app.app, get(&format!("/api/reply/detail?reply-id={second_id}"), None)).await;
    assert_eq!(detail["data"]["content"], "strongly agreed");

    let removed = call(
        &app.app,
        post_json("/api/reply/delete", Some(&replier), json!({ "reply_id": second_id })),
    )
    .await;
    assert_code(&removed, SUCCESS);
    let listed = call(&app.app, get(&format!("/api/reply/list?comment-id={comment_id}"), None)).await;
    assert_eq!(ids(&listed), vec![first_id]);
}

#[tokio::test]
async fn posts_filed_under_a_topic_are_listed_by_topic() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "tagger").await;
    let topic = call(
        &app.app,
        post_json("/api/topic/new", Some(&token), json!({ "name": "gardening" })),
    )
    .await;
    let topic_id = topic["data"]["id"].as_str().unwrap().to_string();

    let filed = call(
        &app.app,
        post_json(
            "/api/post/new",
            Some(&token),
            json!({ "title": "tomatoes", "content": "red", "topic_id": topic_id }),
        ),
    )
    .await;
    assert_code(&filed, SUCCESS);
    let filed_id = filed["data"]["id"].as_i64().unwrap();
    create_post(&app.app, &token, "unfiled").await;

    let listed = call(
        &app.app,
        get(&format!("/api/post/list?type=topic&topic_id={topic_id}"), None),
    )
    .await;
    assert_eq!(ids(&listed), vec![filed_id]);

    let detail = call(&app.app, get(&format!("/api/topic/detail?topic_id={topic_id}"), None)).await;
    assert_eq!(detail["data"]["post_count"], 1);

    let all = call(&app.app, get("/api/post/list", None)).await;
    assert_eq!(ids(&all).len(), 2);
}

#[tokio::test]
async fn search_without_a_service_returns_no_matches() {
    let app = spawn_app();
    let empty = call(&app.app, get("/api/search/post?q=tomato", None)).await;
    assert_code(&empty, SUCCESS);
    assert!(ids(&empty).is_empty());

    let blank = call(&app.app, get("/api/search/post?q=", None)).await;
    assert_code(&blank, PARAMETER_ERROR);
}
