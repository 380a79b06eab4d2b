use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use microblog_api::{
    infrastructure::storage::webp::ImageRules,
    presentation::http::{
        routes::create_router,
        state::{AppState, Backends, ServiceSettings},
    },
};
use serde_json::Value;
use std::{io::Cursor, time::Duration};
use tower::ServiceExt;

pub const SUCCESS: i64 = 0;
pub const PARAMETER_ERROR: i64 = 2;
pub const AUTH_ERROR: i64 = 3;

/// Cheapest cost bcrypt accepts; keeps hashing fast in tests.
const TEST_BCRYPT_COST: u32 = 4;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _images: tempfile::TempDir,
    _avatars: tempfile::TempDir,
}

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        jwt_secret: "test-jwt-secret".to_string(),
        token_ttl_seconds: 3600,
        bcrypt_cost: TEST_BCRYPT_COST,
        store_timeout: Duration::from_secs(5),
        image_rules: ImageRules {
            min_width: 16,
            min_height: 16,
            max_bytes: 1024 * 1024,
        },
        avatar_rules: ImageRules {
            min_width: 16,
            min_height: 16,
            max_bytes: 1024 * 1024,
        },
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(Backends::in_memory(5, 3600))
}

pub fn spawn_app_with(backends: Backends) -> TestApp {
    let state = AppState::new(None, backends, test_settings());
    let images = tempfile::tempdir().expect("failed to create image dir");
    let avatars = tempfile::tempdir().expect("failed to create avatar dir");
    TestApp {
        app: create_router(state.clone(), images.path(), avatars.path()),
        state,
        _images: images,
        _avatars: avatars,
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn read_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("failed to parse json")
}

/// Sends `req`, asserts the transport succeeded and returns the envelope.
pub async fn call(app: &Router, req: Request<Body>) -> Value {
    let res = send(app, req).await;
    assert_eq!(res.status(), StatusCode::OK, "envelope responses are always 200");
    read_json(res).await
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn post_empty(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn assert_code(envelope: &Value, code: i64) {
    assert_eq!(
        envelope["code"].as_i64(),
        Some(code),
        "unexpected envelope: {envelope}"
    );
}

/// Registers `username` and logs in. Returns `(uid, token)`.
pub async fn register_and_login(app: &Router, username: &str) -> (i64, String) {
    let credentials = serde_json::json!({ "username": username, "password": "hunter2-but-longer" });

    let registered = call(app, post_json("/api/user/register", None, credentials.clone())).await;
    assert_code(&registered, SUCCESS);
    let uid = registered["data"]["uid"].as_i64().expect("missing uid");

    let logged_in = call(app, post_json("/api/user/login", None, credentials)).await;
    assert_code(&logged_in, SUCCESS);
    let token = logged_in["data"]["token"]
        .as_str()
        .expect("missing token")
        .to_string();
    (uid, token)
}

/// Publishes a text-only post and returns its id.
pub async fn create_post(app: &Router, token: &str, title: &str) -> i64 {
    let created = call(
        app,
        post_json(
            "/api/post/new",
            Some(token),
            serde_json::json!({ "title": title, "content": format!("{title} body") }),
        ),
    )
    .await;
    assert_code(&created, SUCCESS);
    created["data"]["id"].as_i64().expect("missing post id")
}

pub fn ids(envelope: &Value) -> Vec<i64> {
    envelope["data"]["ids"]
        .as_array()
        .expect("ids should be an array")
        .iter()
        .filter_map(Value::as_i64)
        .collect()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 255) as u8, (y % 255) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode png");
    out.into_inner()
}

pub fn multipart_image_body(field: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "microblog-test-boundary".to_string();
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (boundary, body)
}
