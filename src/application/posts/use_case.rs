use super::dto::{CreatePostCommand, PostListKind, PostListQuery};
use crate::{
    application::{engagement::use_case::ToggleService, infra, required_text},
    domain::{
        engagement::entity::{EngagementKind, EngagementStatus, TargetKind, TargetRef, UpsertOutcome},
        post::{
            entity::{MAX_POST_IMAGES, NewPost, Post},
            repository::PostRepository,
        },
        shared::{
            errors::DomainError,
            ids::ActorId,
            pagination::{CursorPage, reverse_chronological},
        },
        topic::repository::TopicRepository,
    },
    infrastructure::{
        search::{IndexedPost, SearchIndexer},
        storage::{
            traits::ImageStaging,
            webp::{ImageRules, convert_to_webp},
        },
    },
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Post lifecycle: image staging, creation, listing and engagement.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    topics: Arc<dyn TopicRepository>,
    toggles: Arc<ToggleService>,
    images: Arc<dyn ImageStaging>,
    search: Arc<dyn SearchIndexer>,
    image_rules: ImageRules,
    http: reqwest::Client,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        topics: Arc<dyn TopicRepository>,
        toggles: Arc<ToggleService>,
        images: Arc<dyn ImageStaging>,
        search: Arc<dyn SearchIndexer>,
        image_rules: ImageRules,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            posts,
            topics,
            toggles,
            images,
            search,
            image_rules,
            http,
        }
    }

    /// Publishes a post.
    ///
    /// Every image token must name a live staged image; all tokens are checked
    /// before any is promoted so a bad token leaves staging untouched.
    #[instrument(skip(self, command), fields(images = command.images.len()))]
    pub async fn create(
        &self,
        author: ActorId,
        ip_address: Option<String>,
        command: CreatePostCommand,
    ) -> Result<Post, DomainError> {
        let title = required_text("title", &command.title)?;
        let content = required_text("content", &command.content)?;
        if command.images.len() > MAX_POST_IMAGES {
            return Err(DomainError::ValidationError(format!(
                "a post can carry at most {MAX_POST_IMAGES} images"
            )));
        }

        for token in &command.images {
            if !self.images.is_available(token).await.map_err(infra)? {
                return Err(DomainError::ValidationError(format!(
                    "image {token} is missing or expired"
                )));
            }
        }
        if let Some(topic_id) = command.topic_id {
            if self.topics.find_by_id(topic_id).await?.is_none() {
                return Err(DomainError::TargetNotFound(format!("topic {topic_id}")));
            }
        }

        let mut images = Vec::with_capacity(command.images.len());
        for token in &command.images {
            match self.images.promote(token).await {
                Ok(filename) => images.push(filename),
                Err(e) => {
                    self.discard_promoted(&images).await;
                    return Err(infra(e));
                }
            }
        }

        let created = self
            .posts
            .create(NewPost {
                author_id: author,
                ip_address,
                title,
                content,
                images: images.clone(),
                topic_id: command.topic_id,
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(e) => {
                self.discard_promoted(&images).await;
                return Err(e);
            }
        };
        info!(post_id = post.id, "post created");

        let search = self.search.clone();
        let indexed = IndexedPost {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = search.index_post(&indexed).await {
                warn!(post_id = indexed.id, error = %e, "failed to index post");
            }
        });

        Ok(post)
    }

    async fn discard_promoted(&self, images: &[String]) {
        if images.is_empty() {
            return;
        }
        if let Err(e) = self.images.discard(images).await {
            warn!(error = %e, count = images.len(), "failed to discard promoted images");
        }
    }

    pub async fn detail(&self, id: i64) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TargetNotFound(format!("post {id}")))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        let post = self.detail(id).await?;
        if post.author_id != actor {
            return Err(DomainError::Unauthorized);
        }
        if !self.posts.delete(id).await? {
            return Err(DomainError::TargetNotFound(format!("post {id}")));
        }
        info!(post_id = id, "post deleted");
        Ok(())
    }

    /// Post ids, newest first.
    pub async fn list(
        &self,
        viewer: Option<ActorId>,
        query: PostListQuery,
    ) -> Result<Vec<i64>, DomainError> {
        let subject = || {
            query.uid.or(viewer).ok_or_else(|| {
                DomainError::ValidationError("uid is required for this list".to_string())
            })
        };
        match query.kind {
            PostListKind::All => self.posts.list_recent(query.page).await,
            PostListKind::User => self.posts.list_by_author(subject()?, query.page).await,
            PostListKind::Liked => {
                self.engaged_posts(subject()?, EngagementKind::Like, query.page)
                    .await
            }
            PostListKind::Favourited => {
                self.engaged_posts(subject()?, EngagementKind::Favourite, query.page)
                    .await
            }
            PostListKind::Topic => {
                let topic = query.topic_id.ok_or_else(|| {
                    DomainError::ValidationError("topic_id is required".to_string())
                })?;
                self.posts.list_by_topic(topic, query.page).await
            }
        }
    }

    async fn engaged_posts(
        &self,
        actor: ActorId,
        kind: EngagementKind,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        let records = self
            .toggles
            .records_by_actor(actor, TargetKind::Post, kind)
            .await?;
        let ids: Vec<i64> = records
            .iter()
            .filter_map(|r| r.target.id.as_numeric())
            .collect();
        Ok(page.page_after(reverse_chronological(ids), |id| *id))
    }

    /// Posts by everyone `actor` follows, newest first.
    pub async fn follow_feed(
        &self,
        actor: ActorId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        let followees: Vec<ActorId> = self
            .toggles
            .records_by_actor(actor, TargetKind::User, EngagementKind::Follow)
            .await?
            .iter()
            .filter_map(|r| r.target.id.as_numeric())
            .collect();
        if followees.is_empty() {
            return Ok(Vec::new());
        }
        self.posts.list_by_authors(&followees, page).await
    }

    pub async fn user_status(
        &self,
        actor: ActorId,
        id: i64,
    ) -> Result<EngagementStatus, DomainError> {
        self.detail(id).await?;
        self.toggles.status(actor, TargetRef::post(id)).await
    }

    pub async fn like(&self, actor: ActorId, id: i64) -> Result<UpsertOutcome, DomainError> {
        self.toggles.like(actor, TargetRef::post(id)).await
    }

    pub async fn unlike(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.toggles.unlike(actor, TargetRef::post(id)).await
    }

    pub async fn favourite(&self, actor: ActorId, id: i64) -> Result<UpsertOutcome, DomainError> {
        self.toggles.favourite(actor, TargetRef::post(id)).await
    }

    pub async fn unfavourite(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.toggles.unfavourite(actor, TargetRef::post(id)).await
    }

    /// Validates, re-encodes and stages an uploaded image. Returns its token.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn stage_upload(&self, data: Bytes) -> Result<String, DomainError> {
        let rules = self.image_rules;
        let webp = tokio::task::spawn_blocking(move || convert_to_webp(&data, rules))
            .await
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;
        self.images.stage(webp).await.map_err(infra)
    }

    /// Downloads an image and stages it like an upload.
    #[instrument(skip(self))]
    pub async fn stage_from_url(&self, url: &str) -> Result<String, DomainError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|_| DomainError::ValidationError(format!("invalid url: {url}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::ValidationError(
                "only http and https urls are accepted".to_string(),
            ));
        }

        let mut response = self
            .http
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::ValidationError(format!("failed to fetch image: {e}")))?;

        let max = self.image_rules.max_bytes;
        let too_large = || DomainError::ValidationError(format!("image exceeds {max} bytes"));
        if response.content_length().is_some_and(|len| len as usize > max) {
            return Err(too_large());
        }
        // chunked or unlabelled bodies are capped while reading
        let mut buffer = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DomainError::ValidationError(format!("failed to fetch image: {e}")))?
        {
            if buffer.len() + chunk.len() > max {
                return Err(too_large());
            }
            buffer.extend_from_slice(&chunk);
        }
        let data = Bytes::from(buffer);
        self.stage_upload(data).await
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<i64>, DomainError> {
        let keyword = required_text("keyword", keyword)?;
        self.search.search_posts(&keyword).await.map_err(infra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::ids::TopicId;
    use crate::infrastructure::{
        memory::{MemoryBackend, MemoryImageStaging},
        search::DisabledSearchIndexer,
    };

    const RULES: ImageRules = ImageRules {
        min_width: 1,
        min_height: 1,
        max_bytes: 1 << 20,
    };

    struct Fixture {
        backend: Arc<MemoryBackend>,
        staging: Arc<MemoryImageStaging>,
        service: PostService,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::default());
        let staging = Arc::new(MemoryImageStaging::default());
        let toggles = Arc::new(ToggleService::new(
            backend.clone(),
            backend.clone(),
            Duration::from_secs(2),
        ));
        let service = PostService::new(
            backend.clone(),
            backend.clone(),
            toggles,
            staging.clone(),
            Arc::new(DisabledSearchIndexer),
            RULES,
        );
        Fixture {
            backend,
            staging,
            service,
        }
    }

    fn command(title: &str) -> CreatePostCommand {
        CreatePostCommand {
            title: title.to_string(),
            content: "body".to_string(),
            images: vec![],
            topic_id: None,
        }
    }

    #[tokio::test]
    async fn create_requires_title_and_content() {
        let f = fixture();
        let err = f.service.create(1, None, command("  ")).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }

    #[tokio::test]
    async fn create_rejects_more_than_nine_images() {
        let f = fixture();
        let mut cmd = command("t");
        for _ in 0..10 {
            cmd.images.push(f.staging.stage(vec![0]).await.unwrap());
        }
        assert!(matches!(
            f.service.create(1, None, cmd).await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn create_promotes_staged_images() {
        let f = fixture();
        let token = f.staging.stage(vec![1, 2, 3]).await.unwrap();
        let mut cmd = command("t");
        cmd.images.push(token.clone());

        let post = f.service.create(1, None, cmd).await.unwrap();
        assert_eq!(post.images, vec![format!("{token}.webp")]);
        assert!(!f.staging.is_available(&token).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_image_tokens_abort_without_promoting() {
        let f = fixture();
        let good = f.staging.stage(vec![1]).await.unwrap();
        let mut cmd = command("t");
        cmd.images = vec![good.clone(), "f".repeat(32)];

        assert!(f.service.create(1, None, cmd).await.is_err());
        assert!(f.staging.is_available(&good).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_topics_are_rejected() {
        let f = fixture();
        let mut cmd = command("t");
        cmd.topic_id = Some(TopicId::generate());
        assert!(matches!(
            f.service.create(1, None, cmd).await,
            Err(DomainError::TargetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn liked_list_is_most_recent_first() {
        let f = fixture();
        let p1 = f.service.create(1, None, command("p1")).await.unwrap().id;
        let p2 = f.service.create(1, None, command("p2")).await.unwrap().id;
        let p3 = f.service.create(1, None, command("p3")).await.unwrap().id;
        for id in [p1, p2, p3] {
            f.service.like(7, id).await.unwrap();
        }

        let query = PostListQuery {
            kind: PostListKind::Liked,
            uid: Some(7),
            ..Default::default()
        };
        assert_eq!(f.service.list(None, query).await.unwrap(), vec![p3, p2, p1]);
    }

    #[tokio::test]
    async fn liked_list_cursor_skips_past_from() {
        let f = fixture();
        let mut ids = Vec::new();
        for title in ["a", "b", "c", "d"] {
            let id = f.service.create(1, None, command(title)).await.unwrap().id;
            f.service.favourite(7, id).await.unwrap();
            ids.push(id);
        }

        let query = PostListQuery {
            kind: PostListKind::Favourited,
            uid: Some(7),
            page: CursorPage::new(Some(ids[2]), Some(10)),
            ..Default::default()
        };
        assert_eq!(
            f.service.list(None, query).await.unwrap(),
            vec![ids[1], ids[0]]
        );
    }

    #[tokio::test]
    async fn follow_feed_only_shows_followed_authors() {
        let f = fixture();
        let ours = f.service.create(2, None, command("followed")).await.unwrap().id;
        f.service.create(3, None, command("stranger")).await.unwrap();
        use crate::domain::user::repository::UserRepository;
        UserRepository::create(&*f.backend, "u1", "h").await.unwrap();
        UserRepository::create(&*f.backend, "u2", "h").await.unwrap();
        f.service.toggles.follow(1, 2).await.unwrap();

        let feed = f.service.follow_feed(1, CursorPage::default()).await.unwrap();
        assert_eq!(feed, vec![ours]);
    }

    #[tokio::test]
    async fn only_the_author_may_delete() {
        let f = fixture();
        let id = f.service.create(1, None, command("mine")).await.unwrap().id;
        assert_eq!(f.service.delete(2, id).await, Err(DomainError::Unauthorized));
        f.service.delete(1, id).await.unwrap();
        assert!(matches!(
            f.service.detail(id).await,
            Err(DomainError::TargetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_post_drops_its_engagements() {
        let f = fixture();
        let id = f.service.create(1, None, command("mine")).await.unwrap().id;
        f.service.like(7, id).await.unwrap();
        f.service.delete(1, id).await.unwrap();

        let query = PostListQuery {
            kind: PostListKind::Liked,
            uid: Some(7),
            ..Default::default()
        };
        assert!(f.service.list(None, query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_discards_promoted_images() {
        let backend = Arc::new(MemoryBackend::default());
        let staging = Arc::new(MemoryImageStaging::default());
        let mut posts = crate::domain::post::repository::MockPostRepository::new();
        posts
            .expect_create()
            .returning(|_| Err(DomainError::InfrastructureError("insert failed".into())));
        let service = PostService::new(
            Arc::new(posts),
            backend.clone(),
            Arc::new(ToggleService::new(
                backend.clone(),
                backend,
                Duration::from_secs(2),
            )),
            staging.clone(),
            Arc::new(DisabledSearchIndexer),
            RULES,
        );
        let token = staging.stage(vec![5, 5]).await.unwrap();
        let mut cmd = command("t");
        cmd.images.push(token.clone());

        assert!(matches!(
            service.create(1, None, cmd).await,
            Err(DomainError::InfrastructureError(_))
        ));
        assert!(staging.promoted(&format!("{token}.webp")).await.is_none());
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Answers one request with `body` and no `Content-Length`, ending the
    /// body by closing the connection.
    async fn serve_unlabelled(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n")
                .await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/image.png")
    }

    #[tokio::test]
    async fn unlabelled_download_past_the_cap_is_rejected() {
        let f = fixture();
        let url = serve_unlabelled(vec![0u8; RULES.max_bytes + 4096]).await;

        let err = f.service.stage_from_url(&url).await.unwrap_err();
        assert!(
            matches!(&err, DomainError::ValidationError(msg) if msg.contains("exceeds")),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn unlabelled_download_within_the_cap_is_staged() {
        let f = fixture();
        let url = serve_unlabelled(png(8, 8)).await;

        let token = f.service.stage_from_url(&url).await.unwrap();
        assert!(f.staging.is_available(&token).await.unwrap());
    }
}
