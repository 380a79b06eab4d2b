//! Runs the engagement flows against Postgres. Skipped unless `DATABASE_URL`
//! points at a disposable database.

use super::helpers::{
    PARAMETER_ERROR, SUCCESS, assert_code, call, create_post, get, post_empty, post_json,
    spawn_app_with,
};
use microblog_api::{
    domain::engagement::{
        entity::{EngagementKind, EngagementRecord, TargetRef},
        repository::EngagementStore,
    },
    infrastructure::{
        database::pool::create_pool,
        memory::{MemoryAvatarStore, MemoryImageStaging, MemoryTokenList},
        repositories::{
            sqlx_comment_repository::SqlxCommentRepository,
            sqlx_engagement_store::SqlxEngagementStore,
            sqlx_post_repository::SqlxPostRepository,
            sqlx_reply_repository::SqlxReplyRepository,
            sqlx_target_directory::SqlxTargetDirectory,
            sqlx_topic_repository::SqlxTopicRepository,
            sqlx_user_repository::SqlxUserRepository,
        },
        search::DisabledSearchIndexer,
    },
    presentation::http::state::Backends,
};
use axum::Router;
use serde_json::json;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

async fn postgres() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = create_pool(&url, 5, Duration::from_secs(5))
        .await
        .expect("failed to create pool");
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await.expect("migrations failed");
    Some(pool)
}

fn sqlx_backends(pool: &PgPool) -> Backends {
    Backends {
        guard: Arc::new(SqlxTargetDirectory::new(pool.clone())),
        engagements: Arc::new(SqlxEngagementStore::new(pool.clone())),
        users: Arc::new(SqlxUserRepository::new(pool.clone())),
        posts: Arc::new(SqlxPostRepository::new(pool.clone())),
        comments: Arc::new(SqlxCommentRepository::new(pool.clone())),
        replies: Arc::new(SqlxReplyRepository::new(pool.clone())),
        topics: Arc::new(SqlxTopicRepository::new(pool.clone())),
        tokens: Arc::new(MemoryTokenList::new(5)),
        images: Arc::new(MemoryImageStaging::default()),
        avatars: Arc::new(MemoryAvatarStore::default()),
        search: Arc::new(DisabledSearchIndexer),
    }
}

async fn unique_user(app: &Router, prefix: &str) -> (i64, String) {
    let name = format!("{prefix}_{}", &Uuid::new_v4().simple().to_string()[..12]);
    super::helpers::register_and_login(app, &name).await
}

#[tokio::test]
async fn postgres_like_toggles_keep_counters_in_step() {
    let Some(pool) = postgres().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = spawn_app_with(sqlx_backends(&pool));
    let (_, author) = unique_user(&app.app, "pgauthor").await;
    let (_, fan) = unique_user(&app.app, "pgfan").await;
    let post_id = create_post(&app.app, &author, "postgres").await;

    let liked = call(&app.app, post_empty(&format!("/api/post/like?post-id={post_id}"), Some(&fan))).await;
    assert_code(&liked, SUCCESS);
    let again = call(&app.app, post_empty(&format!("/api/post/like?post-id={post_id}"), Some(&fan))).await;
    assert_code(&again, PARAMETER_ERROR);

    let store = SqlxEngagementStore::new(pool.clone());
    let count = store
        .count_by_target(TargetRef::post(post_id), EngagementKind::Like)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let detail = call(&app.app, get(&format!("/api/post/{post_id}"), None)).await;
    assert_eq!(detail["data"]["like_count"], 1);
}

#[tokio::test]
async fn postgres_reconcile_repairs_drifted_counters() {
    let Some(pool) = postgres().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = spawn_app_with(sqlx_backends(&pool));
    let (_, author) = unique_user(&app.app, "pgdrift").await;
    let post_id = create_post(&app.app, &author, "drift").await;

    sqlx::query("UPDATE posts SET like_count = 7 WHERE id = $1")
        .bind(post_id)
        .execute(&pool)
        .await
        .unwrap();

    let store = SqlxEngagementStore::new(pool.clone());
    let report = store.reconcile().await.unwrap();
    assert!(report.counters_fixed >= 1);

    let detail = call(&app.app, get(&format!("/api/post/{post_id}"), None)).await;
    assert_eq!(detail["data"]["like_count"], 0);
}

async fn fresh_comment(app: &Router, pool: &PgPool, tag: &str) -> (i64, SqlxEngagementStore) {
    let (_, author) = unique_user(app, tag).await;
    let post_id = create_post(app, &author, tag).await;
    let comment = call(
        app,
        post_json(
            "/api/comment/new",
            Some(&author),
            json!({ "post_id": post_id, "content": tag }),
        ),
    )
    .await;
    assert_code(&comment, SUCCESS);
    let comment_id = comment["data"]["id"].as_i64().unwrap();
    (comment_id, SqlxEngagementStore::new(pool.clone()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn postgres_concurrent_like_and_dislike_leave_one_vote() {
    let Some(pool) = postgres().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = spawn_app_with(sqlx_backends(&pool));
    let actor: i64 = 9_000_000 + rand::random::<u16>() as i64;

    for _ in 0..25 {
        let (comment_id, store) = fresh_comment(&app.app, &pool, "pgvote").await;
        let store = Arc::new(store);
        let target = TargetRef::comment(comment_id);

        let like = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert(
                        EngagementRecord::new(actor, target, EngagementKind::Like),
                        Some(EngagementKind::Dislike),
                    )
                    .await
            })
        };
        let dislike = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert(
                        EngagementRecord::new(actor, target, EngagementKind::Dislike),
                        Some(EngagementKind::Like),
                    )
                    .await
            })
        };
        like.await.unwrap().unwrap();
        dislike.await.unwrap().unwrap();

        let liked = store
            .contains(actor, target, EngagementKind::Like)
            .await
            .unwrap();
        let disliked = store
            .contains(actor, target, EngagementKind::Dislike)
            .await
            .unwrap();
        assert!(liked ^ disliked, "like={liked} dislike={disliked}");

        let likes = store
            .count_by_target(target, EngagementKind::Like)
            .await
            .unwrap();
        let dislikes = store
            .count_by_target(target, EngagementKind::Dislike)
            .await
            .unwrap();
        assert_eq!((likes, dislikes), (liked as i64, disliked as i64));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn postgres_concurrent_likes_by_distinct_actors_all_count() {
    let Some(pool) = postgres().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let app = spawn_app_with(sqlx_backends(&pool));
    let (comment_id, store) = fresh_comment(&app.app, &pool, "pgcrowd").await;
    let store = Arc::new(store);
    let target = TargetRef::comment(comment_id);

    let handles: Vec<_> = (1..=20_i64)
        .map(|actor| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert(
                        EngagementRecord::new(actor, target, EngagementKind::Like),
                        Some(EngagementKind::Dislike),
                    )
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let likes = store
        .count_by_target(target, EngagementKind::Like)
        .await
        .unwrap();
    assert_eq!(likes, 20);
    let records = store
        .list_by_target(target, EngagementKind::Like)
        .await
        .unwrap();
    assert_eq!(records.len(), 20);
}
