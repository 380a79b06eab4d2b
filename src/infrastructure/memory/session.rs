use crate::{
    domain::shared::ids::ActorId,
    infrastructure::{
        cache::traits::TokenList,
        storage::traits::{AvatarStore, ImageStaging, is_valid_token, new_token},
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

pub struct MemoryTokenList {
    capacity: usize,
    lists: Mutex<HashMap<ActorId, VecDeque<String>>>,
}

impl MemoryTokenList {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lists: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenList for MemoryTokenList {
    async fn push(&self, uid: ActorId, token: &str) -> anyhow::Result<()> {
        let mut lists = self.lists.lock().await;
        let list = lists.entry(uid).or_default();
        list.push_back(token.to_string());
        while list.len() > self.capacity {
            list.pop_front();
        }
        Ok(())
    }

    async fn contains(&self, uid: ActorId, token: &str) -> anyhow::Result<bool> {
        let lists = self.lists.lock().await;
        Ok(lists
            .get(&uid)
            .is_some_and(|list| list.iter().any(|t| t == token)))
    }

    async fn remove(&self, uid: ActorId, token: &str) -> anyhow::Result<bool> {
        let mut lists = self.lists.lock().await;
        let Some(list) = lists.get_mut(&uid) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|t| t != token);
        let removed = list.len() != before;
        if list.is_empty() {
            lists.remove(&uid);
        }
        Ok(removed)
    }

    async fn tokens(&self, uid: ActorId) -> anyhow::Result<Vec<String>> {
        let lists = self.lists.lock().await;
        Ok(lists
            .get(&uid)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn owners(&self) -> anyhow::Result<Vec<ActorId>> {
        Ok(self.lists.lock().await.keys().copied().collect())
    }
}

struct StagedImage {
    data: Vec<u8>,
    expire: i64,
}

#[derive(Default)]
struct StagingState {
    staged: HashMap<String, StagedImage>,
    promoted: HashMap<String, Vec<u8>>,
    clean_queue: Vec<String>,
}

pub struct MemoryImageStaging {
    ttl_seconds: i64,
    state: Mutex<StagingState>,
}

impl MemoryImageStaging {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            state: Mutex::new(StagingState::default()),
        }
    }

    /// Bytes of a promoted image, by file name.
    pub async fn promoted(&self, filename: &str) -> Option<Vec<u8>> {
        self.state.lock().await.promoted.get(filename).cloned()
    }
}

impl Default for MemoryImageStaging {
    fn default() -> Self {
        Self::new(24 * 60 * 60)
    }
}

#[async_trait]
impl ImageStaging for MemoryImageStaging {
    async fn stage(&self, webp: Vec<u8>) -> anyhow::Result<String> {
        let token = new_token();
        let expire = chrono::Utc::now().timestamp() + self.ttl_seconds;
        self.state
            .lock()
            .await
            .staged
            .insert(token.clone(), StagedImage { data: webp, expire });
        Ok(token)
    }

    async fn is_available(&self, token: &str) -> anyhow::Result<bool> {
        if !is_valid_token(token) {
            return Ok(false);
        }
        let now = chrono::Utc::now().timestamp();
        Ok(self
            .state
            .lock()
            .await
            .staged
            .get(token)
            .is_some_and(|img| img.expire >= now))
    }

    async fn promote(&self, token: &str) -> anyhow::Result<String> {
        let mut state = self.state.lock().await;
        let image = state
            .staged
            .remove(token)
            .ok_or_else(|| anyhow::anyhow!("no staged image for {token}"))?;
        let filename = format!("{token}.webp");
        state.promoted.insert(filename.clone(), image.data);
        state.clean_queue.push(filename.clone());
        Ok(filename)
    }

    async fn discard(&self, filenames: &[String]) -> anyhow::Result<u64> {
        let mut state = self.state.lock().await;
        Ok(filenames
            .iter()
            .filter(|name| state.promoted.remove(name.as_str()).is_some())
            .count() as u64)
    }

    async fn sweep_expired(&self) -> anyhow::Result<u64> {
        let mut state = self.state.lock().await;
        let now = chrono::Utc::now().timestamp();
        let expired: Vec<String> = state
            .staged
            .iter()
            .filter(|(_, img)| img.expire < now)
            .map(|(token, _)| token.clone())
            .collect();
        for token in &expired {
            state.staged.remove(token);
            state.clean_queue.push(format!("{token}.webp"));
        }
        Ok(expired.len() as u64)
    }

    async fn drain_clean_queue(&self) -> anyhow::Result<u64> {
        let mut state = self.state.lock().await;
        let drained = state.clean_queue.len() as u64;
        state.clean_queue.clear();
        Ok(drained)
    }
}

#[derive(Default)]
struct AvatarState {
    files: HashMap<String, Vec<u8>>,
    clean_queue: Vec<String>,
}

#[derive(Default)]
pub struct MemoryAvatarStore {
    state: Mutex<AvatarState>,
}

impl MemoryAvatarStore {
    /// Bytes of a stored avatar, by file name.
    pub async fn avatar(&self, filename: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(filename).cloned()
    }

    pub async fn queued(&self) -> Vec<String> {
        self.state.lock().await.clean_queue.clone()
    }
}

#[async_trait]
impl AvatarStore for MemoryAvatarStore {
    async fn save(&self, webp: Vec<u8>) -> anyhow::Result<String> {
        let filename = format!("{}.webp", uuid::Uuid::now_v7().simple());
        self.state
            .lock()
            .await
            .files
            .insert(filename.clone(), webp);
        Ok(filename)
    }

    async fn retire(&self, filename: &str) -> anyhow::Result<()> {
        self.state
            .lock()
            .await
            .clean_queue
            .push(filename.to_string());
        Ok(())
    }

    async fn drain_clean_queue(&self) -> anyhow::Result<u64> {
        let mut state = self.state.lock().await;
        let queued = std::mem::take(&mut state.clean_queue);
        for filename in &queued {
            state.files.remove(filename);
        }
        Ok(queued.len() as u64)
    }
}
