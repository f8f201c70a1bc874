//! 时间窗去重
//!
//! 早于 now - window_hours 的条目丢弃（无发布时间的保留）；
//! 以链接的 (host, path) 作为去重键，忽略 query 与 fragment，先出现者保留。

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::feed::FeedEntry;

/// 时间窗上限（约 100 年），避免 chrono Duration 越界
const MAX_WINDOW_HOURS: u64 = 24 * 365 * 100;

pub fn dedupe_recent(entries: Vec<FeedEntry>, window_hours: u64) -> Vec<FeedEntry> {
    dedupe_recent_at(entries, window_hours, Utc::now())
}

/// 以给定时刻为基准去重
pub fn dedupe_recent_at(
    entries: Vec<FeedEntry>,
    window_hours: u64,
    now: DateTime<Utc>,
) -> Vec<FeedEntry> {
    let cutoff = now - Duration::hours(window_hours.min(MAX_WINDOW_HOURS) as i64);
    let mut seen = HashSet::new();

    entries
        .into_iter()
        .filter(|e| e.published_at.map_or(true, |ts| ts >= cutoff))
        .filter(|e| seen.insert(dedupe_key(&e.link)))
        .collect()
}

/// (host, path) 归一化键；无法解析的链接原样作为键
fn dedupe_key(link: &str) -> String {
    match Url::parse(link.trim()) {
        Ok(url) => format!(
            "{}{}",
            url.host_str().unwrap_or_default().to_lowercase(),
            url.path()
        ),
        Err(_) => link.trim().to_string(),
    }
}
