use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
};
use microblog_api::{
    config::Config,
    infrastructure::{
        cache::redis_token_list::RedisTokenList,
        database::pool::create_pool,
        repositories::{
            sqlx_comment_repository::SqlxCommentRepository,
            sqlx_engagement_store::SqlxEngagementStore,
            sqlx_post_repository::SqlxPostRepository,
            sqlx_reply_repository::SqlxReplyRepository,
            sqlx_target_directory::SqlxTargetDirectory,
            sqlx_topic_repository::SqlxTopicRepository,
            sqlx_user_repository::SqlxUserRepository,
        },
        search::{DisabledSearchIndexer, HttpSearchIndexer, SearchIndexer},
        storage::{local_avatar_store::LocalAvatarStore, local_image_staging::LocalImageStaging},
    },
    presentation::http::{
        routes::create_router,
        state::{AppState, Backends, ServiceSettings},
    },
    workers::{
        avatar_cleanup::AvatarCleanupWorker, engagement_reconcile::EngagementReconcileWorker,
        image_cleanup::ImageCleanupWorker, token_sweep::TokenSweepWorker,
    },
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // RUST_LOG wins when set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new("info,microblog_api=debug,tower_http=debug")
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    let db = create_pool(
        &config.database_url,
        config.database_max_connections,
        config.store_timeout(),
    )
    .await?;
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(config.ignore_missing_migrations);
    migrator.run(&db).await?;

    let redis = redis::Client::open(config.redis_url.clone())?;

    let staging = LocalImageStaging::new(
        redis.clone(),
        &config.post_image_cache_dir,
        &config.post_image_dir,
        config.cache_image_ttl_seconds,
    );
    staging.ensure_dirs().await?;
    let avatars = Arc::new(LocalAvatarStore::new(redis.clone(), &config.avatar_dir));
    avatars.ensure_dir().await?;

    let search: Arc<dyn SearchIndexer> = match &config.search_service_url {
        Some(url) => Arc::new(HttpSearchIndexer::new(url)?),
        None => {
            tracing::warn!("SEARCH_SERVICE_URL not set; post search is disabled");
            Arc::new(DisabledSearchIndexer)
        }
    };

    let engagements = Arc::new(SqlxEngagementStore::new(db.clone()));
    let backends = Backends {
        guard: Arc::new(SqlxTargetDirectory::new(db.clone())),
        engagements: engagements.clone(),
        users: Arc::new(SqlxUserRepository::new(db.clone())),
        posts: Arc::new(SqlxPostRepository::new(db.clone())),
        comments: Arc::new(SqlxCommentRepository::new(db.clone())),
        replies: Arc::new(SqlxReplyRepository::new(db.clone())),
        topics: Arc::new(SqlxTopicRepository::new(db.clone())),
        tokens: Arc::new(RedisTokenList::new(
            redis,
            config.max_tokens_per_user,
            config.token_ttl_seconds.max(0) as u64,
        )),
        images: Arc::new(staging),
        avatars: avatars.clone(),
        search,
    };
    let state = AppState::new(
        Some(db),
        backends,
        ServiceSettings::from_config(&config),
    );

    if config.enable_workers {
        let cleanup =
            ImageCleanupWorker::new(state.images.clone(), config.image_cleanup_interval_seconds);
        tokio::spawn(async move { cleanup.start().await });

        let avatar_cleanup =
            AvatarCleanupWorker::new(avatars, config.avatar_cleanup_interval_seconds);
        tokio::spawn(async move { avatar_cleanup.start().await });

        let sweep = TokenSweepWorker::new(state.users.clone(), config.token_sweep_interval_seconds);
        tokio::spawn(async move { sweep.start().await });

        let reconcile =
            EngagementReconcileWorker::new(engagements, config.reconcile_interval_seconds);
        tokio::spawn(async move { reconcile.start().await });
    }

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let app = create_router(state, &config.post_image_dir, &config.avatar_dir)
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("microblog api listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
