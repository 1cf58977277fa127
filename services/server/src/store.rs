//! In-memory article store.
//!
//! One store per server, guarded by a reader-writer lock so concurrent
//! reads never queue behind each other. Articles arrive exactly once per
//! id: propagation and anti-entropy may redeliver, so every insert
//! deduplicates by id.

use bb_protocol::{Article, ArticleListing};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct ArticleStore {
    articles: RwLock<Vec<Article>>,
}

impl ArticleStore {
    pub fn new() -> Self {
        ArticleStore::default()
    }

    /// Append `article` unless its id is already held. Returns whether the
    /// article was newly inserted.
    pub async fn insert(&self, article: Article) -> bool {
        let mut articles = self.articles.write().await;
        if articles.iter().any(|a| a.id == article.id) {
            return false;
        }
        articles.push(article);
        true
    }

    /// Append every article whose id is not yet held, returning the ones
    /// that were new. Callers use the returned set to advance session
    /// counters exactly once per article.
    pub async fn insert_all(&self, incoming: Vec<Article>) -> Vec<Article> {
        let mut articles = self.articles.write().await;
        let mut inserted = Vec::new();
        for article in incoming {
            if articles.iter().any(|a| a.id == article.id) {
                continue;
            }
            articles.push(article.clone());
            inserted.push(article);
        }
        inserted
    }

    pub async fn get(&self, id: u64) -> Option<Article> {
        let articles = self.articles.read().await;
        articles.iter().find(|a| a.id == id).cloned()
    }

    pub async fn contains(&self, id: u64) -> bool {
        let articles = self.articles.read().await;
        articles.iter().any(|a| a.id == id)
    }

    /// Value copy of the whole store, in arrival order.
    pub async fn snapshot(&self) -> Vec<Article> {
        self.articles.read().await.clone()
    }

    /// Client-facing listing rows: id, parent, title.
    pub async fn summaries(&self) -> Vec<ArticleListing> {
        let articles = self.articles.read().await;
        articles.iter().map(Article::summary).collect()
    }

    /// Peer-facing listing rows carrying full content.
    pub async fn full_listings(&self) -> Vec<ArticleListing> {
        let articles = self.articles.read().await;
        articles.iter().map(Article::full_listing).collect()
    }

    /// Articles written by `client_id` whose write counter is in `counters`.
    pub async fn client_writes(&self, client_id: &str, counters: &[u64]) -> Vec<Article> {
        let articles = self.articles.read().await;
        articles
            .iter()
            .filter(|a| {
                a.client_id.as_deref() == Some(client_id)
                    && a.write_counter.is_some_and(|c| counters.contains(&c))
            })
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.articles.read().await.is_empty()
    }
}
