use super::helpers::{
    AUTH_ERROR, PARAMETER_ERROR, SUCCESS, assert_code, call, get, multipart_image_body, png_bytes,
    post_json, register_and_login, spawn_app,
};
use axum::{
    body::Body,
    http::{Request, header},
};
use serde_json::json;

const PASSWORD: &str = "hunter2-but-longer";

fn avatar_request(token: &str, data: &[u8]) -> Request<Body> {
    let (boundary, body) = multipart_image_body("file", data);
    Request::builder()
        .method("POST")
        .uri("/api/user/upload-avatar")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("failed to build avatar request")
}

#[tokio::test]
async fn changing_the_password_logs_out_every_session() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "rotator").await;

    let wrong = call(
        &app.app,
        post_json(
            "/api/user/update-psw",
            None,
            json!({ "username": "rotator", "password": "not-it", "new_password": "fresh-secret" }),
        ),
    )
    .await;
    assert_code(&wrong, PARAMETER_ERROR);

    let changed = call(
        &app.app,
        post_json(
            "/api/user/update-psw",
            None,
            json!({ "username": "rotator", "password": PASSWORD, "new_password": "fresh-secret" }),
        ),
    )
    .await;
    assert_code(&changed, SUCCESS);

    let stale = call(&app.app, get("/api/user/profile", Some(&token))).await;
    assert_code(&stale, AUTH_ERROR);

    let old_login = call(
        &app.app,
        post_json(
            "/api/user/login",
            None,
            json!({ "username": "rotator", "password": PASSWORD }),
        ),
    )
    .await;
    assert_code(&old_login, PARAMETER_ERROR);

    let new_login = call(
        &app.app,
        post_json(
            "/api/user/login",
            None,
            json!({ "username": "rotator", "password": "fresh-secret" }),
        ),
    )
    .await;
    assert_code(&new_login, SUCCESS);
}

#[tokio::test]
async fn editing_the_profile_updates_only_the_given_fields() {
    let app = spawn_app();
    let (uid, token) = register_and_login(&app.app, "editor").await;

    let anonymous = call(
        &app.app,
        post_json("/api/user/edit", None, json!({ "nickname": "ghost" })),
    )
    .await;
    assert_code(&anonymous, AUTH_ERROR);

    let edited = call(
        &app.app,
        post_json(
            "/api/user/edit",
            Some(&token),
            json!({ "nickname": "Ed", "birth": 946684800 }),
        ),
    )
    .await;
    assert_code(&edited, SUCCESS);
    assert_eq!(edited["data"]["nickname"], "Ed");

    let gender = call(
        &app.app,
        post_json("/api/user/edit", Some(&token), json!({ "gender": "other" })),
    )
    .await;
    assert_code(&gender, SUCCESS);

    let profile = call(&app.app, get(&format!("/api/user/profile?uid={uid}"), None)).await;
    assert_eq!(profile["data"]["nickname"], "Ed");
    assert_eq!(profile["data"]["birth"], 946684800);
    assert_eq!(profile["data"]["gender"], "other");

    let too_long = call(
        &app.app,
        post_json(
            "/api/user/edit",
            Some(&token),
            json!({ "nickname": "x".repeat(40) }),
        ),
    )
    .await;
    assert_code(&too_long, PARAMETER_ERROR);
}

#[tokio::test]
async fn uploading_an_avatar_replaces_the_default() {
    let app = spawn_app();
    let (uid, token) = register_and_login(&app.app, "selfie").await;

    let profile = call(&app.app, get(&format!("/api/user/profile?uid={uid}"), None)).await;
    assert_eq!(profile["data"]["avatar"], "/resources/avatar/vanilla.webp");

    let uploaded = call(&app.app, avatar_request(&token, &png_bytes(32, 32))).await;
    assert_code(&uploaded, SUCCESS);
    let avatar = uploaded["data"]["avatar"].as_str().unwrap().to_string();
    assert!(avatar.starts_with("/resources/avatar/") && avatar.ends_with(".webp"));

    let profile = call(&app.app, get(&format!("/api/user/profile?uid={uid}"), None)).await;
    assert_eq!(profile["data"]["avatar"], avatar.as_str());

    let tiny = call(&app.app, avatar_request(&token, &png_bytes(4, 4))).await;
    assert_code(&tiny, PARAMETER_ERROR);
}
