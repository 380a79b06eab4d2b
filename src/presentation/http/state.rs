use crate::{
    application::{
        comments::use_case::CommentService, engagement::use_case::ToggleService,
        follows::use_case::FollowService, posts::use_case::PostService,
        replies::use_case::ReplyService, topics::use_case::TopicService,
        users::use_case::UserService,
    },
    config::Config,
    domain::{
        comment::repository::CommentRepository,
        engagement::repository::{EngagementStore, ExistenceGuard},
        post::repository::PostRepository,
        reply::repository::ReplyRepository,
        topic::repository::TopicRepository,
        user::repository::UserRepository,
    },
    infrastructure::{
        cache::traits::TokenList,
        memory::{MemoryAvatarStore, MemoryBackend, MemoryImageStaging, MemoryTokenList},
        search::{DisabledSearchIndexer, SearchIndexer},
        security::jwt::TokenIssuer,
        storage::{
            traits::{AvatarStore, ImageStaging},
            webp::ImageRules,
        },
    },
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    /// Pool used by the health check; `None` when running on in-memory backends.
    pub db: Option<PgPool>,
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub replies: Arc<ReplyService>,
    pub topics: Arc<TopicService>,
    pub follows: Arc<FollowService>,
    pub engagements: Arc<dyn EngagementStore>,
    pub images: Arc<dyn ImageStaging>,
    pub avatars: Arc<dyn AvatarStore>,
}

/// Storage and collaborator implementations the services are built on.
#[derive(Clone)]
pub struct Backends {
    pub guard: Arc<dyn ExistenceGuard>,
    pub engagements: Arc<dyn EngagementStore>,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub replies: Arc<dyn ReplyRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub tokens: Arc<dyn TokenList>,
    pub images: Arc<dyn ImageStaging>,
    pub avatars: Arc<dyn AvatarStore>,
    pub search: Arc<dyn SearchIndexer>,
}

impl Backends {
    /// Everything in process: one `MemoryBackend` behind every repository.
    pub fn in_memory(max_tokens_per_user: usize, image_ttl_seconds: i64) -> Self {
        let content = Arc::new(MemoryBackend::new());
        Self {
            guard: content.clone(),
            engagements: content.clone(),
            users: content.clone(),
            posts: content.clone(),
            comments: content.clone(),
            replies: content.clone(),
            topics: content,
            tokens: Arc::new(MemoryTokenList::new(max_tokens_per_user)),
            images: Arc::new(MemoryImageStaging::new(image_ttl_seconds)),
            avatars: Arc::new(MemoryAvatarStore::default()),
            search: Arc::new(DisabledSearchIndexer),
        }
    }
}

/// Service tunables taken from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub store_timeout: Duration,
    pub image_rules: ImageRules,
    pub avatar_rules: ImageRules,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_seconds: config.token_ttl_seconds,
            bcrypt_cost: config.bcrypt_cost,
            store_timeout: config.store_timeout(),
            image_rules: ImageRules {
                min_width: config.post_image_min_width,
                min_height: config.post_image_min_height,
                max_bytes: config.post_image_max_bytes,
            },
            avatar_rules: ImageRules {
                min_width: config.avatar_min_size,
                min_height: config.avatar_min_size,
                max_bytes: config.avatar_max_bytes,
            },
        }
    }
}

impl AppState {
    pub fn new(db: Option<PgPool>, backends: Backends, settings: ServiceSettings) -> Self {
        let toggles = Arc::new(ToggleService::new(
            backends.guard,
            backends.engagements.clone(),
            settings.store_timeout,
        ));
        let issuer = TokenIssuer::new(&settings.jwt_secret, settings.token_ttl_seconds);

        Self {
            db,
            users: Arc::new(UserService::new(
                backends.users.clone(),
                backends.tokens,
                backends.avatars.clone(),
                issuer,
                settings.bcrypt_cost,
                settings.avatar_rules,
            )),
            posts: Arc::new(PostService::new(
                backends.posts.clone(),
                backends.topics.clone(),
                toggles.clone(),
                backends.images.clone(),
                backends.search,
                settings.image_rules,
            )),
            comments: Arc::new(CommentService::new(
                backends.comments.clone(),
                backends.posts.clone(),
                toggles.clone(),
            )),
            replies: Arc::new(ReplyService::new(
                backends.replies,
                backends.comments,
                toggles.clone(),
            )),
            topics: Arc::new(TopicService::new(
                backends.topics,
                backends.posts,
                toggles.clone(),
            )),
            follows: Arc::new(FollowService::new(backends.users, toggles)),
            engagements: backends.engagements,
            images: backends.images,
            avatars: backends.avatars,
        }
    }
}
