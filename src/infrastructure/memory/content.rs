use crate::domain::{
    comment::{
        entity::{Comment, NewComment},
        repository::CommentRepository,
    },
    engagement::{
        entity::{
            EngagementKind, EngagementRecord, ReconcileReport, TargetId, TargetKind, TargetRef,
            UpsertOutcome,
        },
        repository::{EngagementStore, ExistenceGuard},
    },
    post::{
        entity::{NewPost, Post},
        repository::PostRepository,
    },
    reply::{
        entity::{NewReply, Reply},
        repository::ReplyRepository,
    },
    shared::{
        errors::DomainError,
        ids::{ActorId, TopicId},
        pagination::CursorPage,
    },
    topic::{
        entity::{NewTopic, Topic},
        repository::TopicRepository,
    },
    user::{
        entity::{DEFAULT_AVATAR, ProfileUpdate, User},
        repository::UserRepository,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Default)]
struct Sequences {
    user: i64,
    post: i64,
    comment: i64,
    reply: i64,
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    replies: BTreeMap<i64, Reply>,
    topics: BTreeMap<TopicId, Topic>,
    /// Insertion order is creation order.
    engagements: Vec<EngagementRecord>,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl Tables {
    fn exists(&self, target: &TargetRef) -> bool {
        match (target.kind, target.id) {
            (TargetKind::Post, TargetId::Numeric(id)) => self.posts.contains_key(&id),
            (TargetKind::Comment, TargetId::Numeric(id)) => self.comments.contains_key(&id),
            (TargetKind::Reply, TargetId::Numeric(id)) => self.replies.contains_key(&id),
            (TargetKind::User, TargetId::Numeric(id)) => self.users.contains_key(&id),
            (TargetKind::Topic, TargetId::Object(id)) => self.topics.contains_key(&id),
            _ => false,
        }
    }

    fn counter_mut(&mut self, target: &TargetRef, kind: EngagementKind) -> Option<&mut i64> {
        use EngagementKind::*;
        match (target.kind, target.id) {
            (TargetKind::Post, TargetId::Numeric(id)) => {
                let post = self.posts.get_mut(&id)?;
                match kind {
                    Like => Some(&mut post.like_count),
                    Favourite => Some(&mut post.favourite_count),
                    _ => None,
                }
            }
            (TargetKind::Comment, TargetId::Numeric(id)) => {
                let comment = self.comments.get_mut(&id)?;
                match kind {
                    Like => Some(&mut comment.like_count),
                    Dislike => Some(&mut comment.dislike_count),
                    _ => None,
                }
            }
            (TargetKind::Reply, TargetId::Numeric(id)) => {
                let reply = self.replies.get_mut(&id)?;
                match kind {
                    Like => Some(&mut reply.like_count),
                    Dislike => Some(&mut reply.dislike_count),
                    _ => None,
                }
            }
            (TargetKind::Topic, TargetId::Object(id)) => {
                let topic = self.topics.get_mut(&id)?;
                match kind {
                    Like => Some(&mut topic.like_count),
                    Dislike => Some(&mut topic.dislike_count),
                    _ => None,
                }
            }
            (TargetKind::User, TargetId::Numeric(id)) => {
                let user = self.users.get_mut(&id)?;
                match kind {
                    Follow => Some(&mut user.follower_count),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn adjust(&mut self, target: &TargetRef, kind: EngagementKind, delta: i64) {
        if let Some(counter) = self.counter_mut(target, kind) {
            *counter = (*counter + delta).max(0);
        }
    }

    fn adjust_following(&mut self, actor: ActorId, delta: i64) {
        if let Some(user) = self.users.get_mut(&actor) {
            user.following_count = (user.following_count + delta).max(0);
        }
    }

    fn position(&self, actor: ActorId, target: &TargetRef, kind: EngagementKind) -> Option<usize> {
        self.engagements
            .iter()
            .position(|r| r.actor == actor && r.target == *target && r.kind == kind)
    }

    fn purge(&mut self, target: &TargetRef) -> u64 {
        let before = self.engagements.len();
        self.engagements.retain(|r| r.target != *target);
        (before - self.engagements.len()) as u64
    }
}

/// In-process implementation of every repository and store trait.
///
/// All tables sit behind one lock, so each call is atomic with respect to
/// every other call; that mirrors the transactional guarantees of the
/// Postgres implementation closely enough for service and router tests.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExistenceGuard for MemoryBackend {
    async fn exists(&self, target: &TargetRef) -> Result<bool, DomainError> {
        Ok(self.tables.lock().await.exists(target))
    }
}

#[async_trait]
impl EngagementStore for MemoryBackend {
    async fn upsert(
        &self,
        record: EngagementRecord,
        clear: Option<EngagementKind>,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut t = self.tables.lock().await;
        if t.position(record.actor, &record.target, record.kind).is_some() {
            return Err(DomainError::AlreadyEngaged(format!(
                "{} on {}",
                record.kind, record.target
            )));
        }
        if !t.exists(&record.target) {
            return Err(DomainError::TargetNotFound(record.target.to_string()));
        }

        let mut outcome = UpsertOutcome::default();
        if let Some(opposing) = clear {
            if let Some(idx) = t.position(record.actor, &record.target, opposing) {
                t.engagements.remove(idx);
                t.adjust(&record.target, opposing, -1);
                outcome.cleared_opposing = true;
            }
        }

        t.adjust(&record.target, record.kind, 1);
        if record.kind == EngagementKind::Follow {
            t.adjust_following(record.actor, 1);
        }
        t.engagements.push(record);
        Ok(outcome)
    }

    async fn delete(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<(), DomainError> {
        let mut t = self.tables.lock().await;
        let idx = t
            .position(actor, &target, kind)
            .ok_or_else(|| DomainError::NotEngaged(format!("{kind} on {target}")))?;
        t.engagements.remove(idx);
        t.adjust(&target, kind, -1);
        if kind == EngagementKind::Follow {
            t.adjust_following(actor, -1);
        }
        Ok(())
    }

    async fn contains(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<bool, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .position(actor, &target, kind)
            .is_some())
    }

    async fn count_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<i64, DomainError> {
        let mut t = self.tables.lock().await;
        t.counter_mut(&target, kind)
            .map(|c| *c)
            .ok_or_else(|| DomainError::TargetNotFound(target.to_string()))
    }

    async fn list_by_actor(
        &self,
        actor: ActorId,
        target_kind: TargetKind,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.engagements
            .iter()
            .filter(|r| r.actor == actor && r.target.kind == target_kind && r.kind == kind)
            .cloned()
            .collect())
    }

    async fn list_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.engagements
            .iter()
            .filter(|r| r.target == target && r.kind == kind)
            .cloned()
            .collect())
    }

    async fn purge_target(&self, target: TargetRef) -> Result<u64, DomainError> {
        Ok(self.tables.lock().await.purge(&target))
    }

    async fn reconcile(&self) -> Result<ReconcileReport, DomainError> {
        let mut guard = self.tables.lock().await;
        let t = &mut *guard;
        let mut report = ReconcileReport::default();

        let before = t.engagements.len();
        let records = std::mem::take(&mut t.engagements);
        t.engagements = records.into_iter().filter(|r| t.exists(&r.target)).collect();
        report.orphans_removed = (before - t.engagements.len()) as u64;

        let mut expected: HashMap<(TargetRef, EngagementKind), i64> = HashMap::new();
        let mut following: HashMap<ActorId, i64> = HashMap::new();
        for r in &t.engagements {
            *expected.entry((r.target, r.kind)).or_default() += 1;
            if r.kind == EngagementKind::Follow {
                *following.entry(r.actor).or_default() += 1;
            }
        }

        let mut targets: Vec<TargetRef> = Vec::new();
        targets.extend(t.posts.keys().map(|id| TargetRef::post(*id)));
        targets.extend(t.comments.keys().map(|id| TargetRef::comment(*id)));
        targets.extend(t.replies.keys().map(|id| TargetRef::reply(*id)));
        targets.extend(t.topics.keys().map(|id| TargetRef::topic(*id)));
        targets.extend(t.users.keys().map(|id| TargetRef::user(*id)));

        for target in targets {
            for kind in target.kind.supported() {
                let want = expected.get(&(target, *kind)).copied().unwrap_or(0);
                if let Some(counter) = t.counter_mut(&target, *kind) {
                    if *counter != want {
                        *counter = want;
                        report.counters_fixed += 1;
                    }
                }
            }
        }
        for user in t.users.values_mut() {
            let want = following.get(&user.id).copied().unwrap_or(0);
            if user.following_count != want {
                user.following_count = want;
                report.counters_fixed += 1;
            }
        }
        Ok(report)
    }
}

fn page_desc<'a>(ids: impl DoubleEndedIterator<Item = &'a i64>, page: CursorPage) -> Vec<i64> {
    let bound = page.upper_bound();
    ids.rev()
        .filter(|id| **id < bound)
        .take(page.limit())
        .copied()
        .collect()
}

#[async_trait]
impl PostRepository for MemoryBackend {
    async fn create(&self, post: NewPost) -> Result<Post, DomainError> {
        let mut t = self.tables.lock().await;
        let id = next(&mut t.seq.post);
        let now = Utc::now();
        let row = Post {
            id,
            author_id: post.author_id,
            ip_address: post.ip_address,
            title: post.title,
            content: post.content,
            images: post.images,
            topic_id: post.topic_id,
            like_count: 0,
            favourite_count: 0,
            created_at: now,
            updated_at: now,
        };
        t.posts.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DomainError> {
        Ok(self.tables.lock().await.posts.get(&id).cloned())
    }

    async fn list_recent(&self, page: CursorPage) -> Result<Vec<i64>, DomainError> {
        Ok(page_desc(self.tables.lock().await.posts.keys(), page))
    }

    async fn list_by_author(
        &self,
        author: ActorId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        let t = self.tables.lock().await;
        let ids = t.posts.values().filter(|p| p.author_id == author).map(|p| &p.id);
        Ok(page_desc(ids, page))
    }

    async fn list_by_topic(
        &self,
        topic: TopicId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        let t = self.tables.lock().await;
        let ids = t
            .posts
            .values()
            .filter(|p| p.topic_id == Some(topic))
            .map(|p| &p.id);
        Ok(page_desc(ids, page))
    }

    async fn list_by_authors(
        &self,
        authors: &[ActorId],
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        let t = self.tables.lock().await;
        let ids = t
            .posts
            .values()
            .filter(|p| authors.contains(&p.author_id))
            .map(|p| &p.id);
        Ok(page_desc(ids, page))
    }

    async fn count_by_topic(&self, topic: TopicId) -> Result<i64, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.posts.values().filter(|p| p.topic_id == Some(topic)).count() as i64)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut t = self.tables.lock().await;
        if t.posts.remove(&id).is_none() {
            return Ok(false);
        }
        t.purge(&TargetRef::post(id));

        let comment_ids: Vec<i64> = t
            .comments
            .values()
            .filter(|c| c.post_id == id)
            .map(|c| c.id)
            .collect();
        for comment_id in comment_ids {
            remove_comment(&mut t, comment_id);
        }
        Ok(true)
    }
}

fn remove_comment(t: &mut Tables, id: i64) -> bool {
    if t.comments.remove(&id).is_none() {
        return false;
    }
    t.purge(&TargetRef::comment(id));
    let reply_ids: Vec<i64> = t
        .replies
        .values()
        .filter(|r| r.comment_id == id)
        .map(|r| r.id)
        .collect();
    for reply_id in reply_ids {
        t.replies.remove(&reply_id);
        t.purge(&TargetRef::reply(reply_id));
    }
    true
}

#[async_trait]
impl CommentRepository for MemoryBackend {
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError> {
        let mut t = self.tables.lock().await;
        let id = next(&mut t.seq.comment);
        let now = Utc::now();
        let row = Comment {
            id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            username: comment.username,
            content: comment.content,
            like_count: 0,
            dislike_count: 0,
            created_at: now,
            updated_at: now,
        };
        t.comments.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, DomainError> {
        Ok(self.tables.lock().await.comments.get(&id).cloned())
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool, DomainError> {
        let mut t = self.tables.lock().await;
        Ok(match t.comments.get_mut(&id) {
            Some(comment) => {
                comment.content = content.to_string();
                comment.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        Ok(remove_comment(&mut *self.tables.lock().await, id))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<i64>, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.comments
            .values()
            .rev()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect())
    }
}

#[async_trait]
impl ReplyRepository for MemoryBackend {
    async fn create(&self, reply: NewReply) -> Result<Reply, DomainError> {
        let mut t = self.tables.lock().await;
        let id = next(&mut t.seq.reply);
        let now = Utc::now();
        let row = Reply {
            id,
            comment_id: reply.comment_id,
            parent_reply_id: reply.parent_reply_id,
            parent_reply_uid: reply.parent_reply_uid,
            author_id: reply.author_id,
            username: reply.username,
            content: reply.content,
            like_count: 0,
            dislike_count: 0,
            created_at: now,
            updated_at: now,
        };
        t.replies.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reply>, DomainError> {
        Ok(self.tables.lock().await.replies.get(&id).cloned())
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool, DomainError> {
        let mut t = self.tables.lock().await;
        Ok(match t.replies.get_mut(&id) {
            Some(reply) => {
                reply.content = content.to_string();
                reply.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut t = self.tables.lock().await;
        if t.replies.remove(&id).is_none() {
            return Ok(false);
        }
        t.purge(&TargetRef::reply(id));
        for child in t.replies.values_mut() {
            if child.parent_reply_id == Some(id) {
                child.parent_reply_id = None;
            }
        }
        Ok(true)
    }

    async fn list_by_comment(&self, comment_id: i64) -> Result<Vec<i64>, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.replies
            .values()
            .filter(|r| r.comment_id == comment_id)
            .map(|r| r.id)
            .collect())
    }
}

#[async_trait]
impl TopicRepository for MemoryBackend {
    async fn create(&self, topic: NewTopic) -> Result<Topic, DomainError> {
        let mut t = self.tables.lock().await;
        if t.topics.values().any(|existing| existing.name == topic.name) {
            return Err(DomainError::ValidationError(format!(
                "topic {} already exists",
                topic.name
            )));
        }
        let row = Topic {
            id: topic.id,
            name: topic.name,
            description: topic.description,
            creator_id: topic.creator_id,
            like_count: 0,
            dislike_count: 0,
            created_at: Utc::now(),
        };
        t.topics.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: TopicId) -> Result<Option<Topic>, DomainError> {
        Ok(self.tables.lock().await.topics.get(&id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Topic>, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.topics.values().rev().take(limit as usize).cloned().collect())
    }

    async fn list_hot(&self, limit: i64) -> Result<Vec<Topic>, DomainError> {
        let t = self.tables.lock().await;
        let mut topics: Vec<Topic> = t.topics.values().cloned().collect();
        topics.sort_by(|a, b| b.like_count.cmp(&a.like_count).then(b.id.cmp(&a.id)));
        topics.truncate(limit as usize);
        Ok(topics)
    }

    async fn delete(&self, id: TopicId) -> Result<bool, DomainError> {
        let mut t = self.tables.lock().await;
        if t.topics.remove(&id).is_none() {
            return Ok(false);
        }
        t.purge(&TargetRef::topic(id));
        for post in t.posts.values_mut() {
            if post.topic_id == Some(id) {
                post.topic_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryBackend {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, DomainError> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.username == username) {
            return Err(DomainError::ValidationError(format!(
                "username {username} is taken"
            )));
        }
        let id = next(&mut t.seq.user);
        let now = Utc::now();
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            nickname: String::new(),
            birth: None,
            gender: String::new(),
            avatar: DEFAULT_AVATAR.to_string(),
            follower_count: 0,
            following_count: 0,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: ActorId) -> Result<Option<User>, DomainError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_password(&self, id: ActorId, password_hash: &str) -> Result<(), DomainError> {
        let mut t = self.tables.lock().await;
        let user = t
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::TargetNotFound(format!("user {id}")))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(
        &self,
        id: ActorId,
        update: ProfileUpdate,
    ) -> Result<User, DomainError> {
        let mut t = self.tables.lock().await;
        let user = t
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::TargetNotFound(format!("user {id}")))?;
        if let Some(nickname) = update.nickname {
            user.nickname = nickname;
        }
        if let Some(birth) = update.birth {
            user.birth = Some(birth);
        }
        if let Some(gender) = update.gender {
            user.gender = gender;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn replace_avatar(&self, id: ActorId, avatar: &str) -> Result<String, DomainError> {
        let mut t = self.tables.lock().await;
        let user = t
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::TargetNotFound(format!("user {id}")))?;
        user.updated_at = Utc::now();
        Ok(std::mem::replace(&mut user.avatar, avatar.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reconcile_drops_orphans_and_repairs_counters() {
        let backend = MemoryBackend::new();
        let post = PostRepository::create(
            &backend,
            NewPost {
                author_id: 1,
                ip_address: None,
                title: "t".into(),
                content: "c".into(),
                images: vec![],
                topic_id: None,
            },
        )
        .await
        .unwrap();
        backend
            .upsert(
                EngagementRecord::new(7, TargetRef::post(post.id), EngagementKind::Like),
                None,
            )
            .await
            .unwrap();

        {
            let mut t = backend.tables.lock().await;
            t.engagements.push(EngagementRecord::new(
                7,
                TargetRef::comment(999),
                EngagementKind::Like,
            ));
            if let Some(p) = t.posts.get_mut(&post.id) {
                p.like_count = 40;
            }
        }

        let report = backend.reconcile().await.unwrap();
        assert_eq!(report.orphans_removed, 1);
        assert_eq!(report.counters_fixed, 1);
        assert_eq!(
            backend
                .count_by_target(TargetRef::post(post.id), EngagementKind::Like)
                .await
                .unwrap(),
            1
        );
    }
}
