//! 新闻源：抓取与归一化 → 时间窗去重 → 按域名分派给 agent

pub mod dedupe;
pub mod ingest;
pub mod router;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use dedupe::{dedupe_recent, dedupe_recent_at};
pub use ingest::{parse_entries, FeedSource, HttpFeedSource};
pub use router::{filter_by_domains, host_matches};

/// 归一化后的新闻条目，仅在抓取 → 入队之间短暂存在
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}
