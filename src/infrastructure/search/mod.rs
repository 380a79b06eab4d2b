//! Full-text search is delegated to an external HTTP service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedPost {
    pub id: i64,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait SearchIndexer: Send + Sync {
    async fn index_post(&self, post: &IndexedPost) -> anyhow::Result<()>;
    /// Matching post ids, best match first.
    async fn search_posts(&self, keyword: &str) -> anyhow::Result<Vec<i64>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    ids: Vec<i64>,
}

pub struct HttpSearchIndexer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchIndexer {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchIndexer for HttpSearchIndexer {
    async fn index_post(&self, post: &IndexedPost) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/index/post", self.base_url))
            .json(post)
            .send()
            .await?
            .error_for_status()?;
        debug!(post_id = post.id, "post sent to search index");
        Ok(())
    }

    async fn search_posts(&self, keyword: &str) -> anyhow::Result<Vec<i64>> {
        let mut url = reqwest::Url::parse(&format!("{}/search", self.base_url))?;
        url.query_pairs_mut().append_pair("q", keyword);
        let response: SearchResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.ids)
    }
}

/// Used when no search service is configured.
pub struct DisabledSearchIndexer;

#[async_trait]
impl SearchIndexer for DisabledSearchIndexer {
    async fn index_post(&self, post: &IndexedPost) -> anyhow::Result<()> {
        debug!(post_id = post.id, "search disabled, skipping index");
        Ok(())
    }

    async fn search_posts(&self, keyword: &str) -> anyhow::Result<Vec<i64>> {
        debug!(keyword, "search disabled, returning no results");
        Ok(Vec::new())
    }
}
