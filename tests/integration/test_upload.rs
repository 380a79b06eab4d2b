use super::helpers::{
    PARAMETER_ERROR, SUCCESS, assert_code, call, multipart_image_body, png_bytes, post_json,
    register_and_login, spawn_app,
};
use axum::{
    body::Body,
    http::{Request, header},
};
use serde_json::json;

fn upload_request(token: &str, field: &str, data: &[u8]) -> Request<Body> {
    let (boundary, body) = multipart_image_body(field, data);
    Request::builder()
        .method("POST")
        .uri("/api/post/upload/img/file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("failed to build upload request")
}

#[tokio::test]
async fn staged_upload_is_promoted_when_a_post_claims_it() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "photographer").await;

    let staged = call(&app.app, upload_request(&token, "file", &png_bytes(32, 32))).await;
    assert_code(&staged, SUCCESS);
    let image_token = staged["data"]["token"].as_str().unwrap().to_string();

    let post = call(
        &app.app,
        post_json(
            "/api/post/new",
            Some(&token),
            json!({ "title": "sunset", "content": "orange", "images": [image_token] }),
        ),
    )
    .await;
    assert_code(&post, SUCCESS);
    assert_eq!(
        post["data"]["images"],
        json!([format!("/resources/image/{image_token}.webp")])
    );
    assert!(post["data"].get("ip_address").is_none());

    // a promoted token cannot be claimed twice
    let reuse = call(
        &app.app,
        post_json(
            "/api/post/new",
            Some(&token),
            json!({ "title": "again", "content": "orange", "images": [image_token] }),
        ),
    )
    .await;
    assert_code(&reuse, PARAMETER_ERROR);
}

#[tokio::test]
async fn undersized_and_undecodable_uploads_are_rejected() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "uploader").await;

    let tiny = call(&app.app, upload_request(&token, "file", &png_bytes(4, 4))).await;
    assert_code(&tiny, PARAMETER_ERROR);

    let garbage = call(&app.app, upload_request(&token, "file", b"not an image")).await;
    assert_code(&garbage, PARAMETER_ERROR);

    let wrong_field = call(&app.app, upload_request(&token, "photo", &png_bytes(32, 32))).await;
    assert_code(&wrong_field, PARAMETER_ERROR);
}

#[tokio::test]
async fn unknown_image_tokens_block_post_creation() {
    let app = spawn_app();
    let (_, token) = register_and_login(&app.app, "forger").await;

    let res = call(
        &app.app,
        post_json(
            "/api/post/new",
            Some(&token),
            json!({ "title": "fake", "content": "x", "images": ["0123456789abcdef0123456789abcdef"] }),
        ),
    )
    .await;
    assert_code(&res, PARAMETER_ERROR);

    let too_many: Vec<String> = (0..10).map(|i| format!("{i:032x}")).collect();
    let res = call(
        &app.app,
        post_json(
            "/api/post/new",
            Some(&token),
            json!({ "title": "many", "content": "x", "images": too_many }),
        ),
    )
    .await;
    assert_code(&res, PARAMETER_ERROR);
}
