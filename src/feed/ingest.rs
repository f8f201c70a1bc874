//! 抓取 RSS/Atom/JSON Feed 并归一化为 FeedEntry
//!
//! 只取源中前 max_items 条；缺标题或缺链接的条目丢弃；按发布时间倒序，无时间的排在最后（视为 0）。

use std::time::Duration;

use async_trait::async_trait;

use crate::feed::FeedEntry;
use crate::integrations::ClientError;

/// Feed 来源：生产实现走 HTTP，测试可替换为固定数据
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str, max_items: usize) -> Result<Vec<FeedEntry>, ClientError>;
}

pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("shortcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        Self::new(20)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str, max_items: usize) -> Result<Vec<FeedEntry>, ClientError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        let bytes = resp.bytes().await?;
        let entries = parse_entries(&bytes, max_items)?;
        tracing::info!(feed_url = %url, entries = entries.len(), "feed parsed");
        Ok(entries)
    }
}

/// 解析 Feed 正文
pub fn parse_entries(bytes: &[u8], max_items: usize) -> Result<Vec<FeedEntry>, ClientError> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| ClientError::Parse(format!("invalid feed: {}", e)))?;

    let mut out: Vec<FeedEntry> = feed
        .entries
        .into_iter()
        .take(max_items)
        .filter_map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .filter(|l| !l.is_empty())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())?;
            Some(FeedEntry {
                title,
                link,
                published_at: entry.published.or(entry.updated),
            })
        })
        .collect();

    out.sort_by_key(|e| std::cmp::Reverse(e.published_at.map(|t| t.timestamp()).unwrap_or(0)));
    Ok(out)
}
