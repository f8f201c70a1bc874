//! 队列存储与条目状态机
//!
//! 条目按入队顺序保存；状态只允许 pending → completed / pending → failed 单向迁移，
//! 终态条目再次迁移会被拒绝。运行结束后由编排器调用 compact 移除 completed 条目，failed 保留供人工查看。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::feed::FeedEntry;

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 队列条目：一篇待转成短视频的文章，归属某个 agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub title: String,
    pub url: String,
    /// agent 名（配置中的键）
    pub agent: String,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

/// 有序队列
#[derive(Debug, Default)]
pub struct QueueStore {
    items: Vec<QueueItem>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队：分配新 id，状态为 pending；标题或链接为空的条目不会入队
    pub fn enqueue(&mut self, entry: &FeedEntry, agent: &str) -> Result<QueueItem, SchedulerError> {
        let title = entry.title.trim();
        let url = entry.link.trim();
        if title.is_empty() || url.is_empty() {
            return Err(SchedulerError::IncompleteEntry);
        }

        let mut id = Self::new_id(agent);
        while self.items.iter().any(|i| i.id == id) {
            id = Self::new_id(agent);
        }

        let item = QueueItem {
            id,
            title: title.to_string(),
            url: url.to_string(),
            agent: agent.to_string(),
            status: ItemStatus::Pending,
            created_at: Utc::now(),
        };
        self.items.push(item.clone());
        Ok(item)
    }

    fn new_id(agent: &str) -> String {
        format!("{}_{}", agent, uuid::Uuid::new_v4().simple())
    }

    pub fn list(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending)
            .count()
    }

    /// 所属 agent 满足条件的 pending 条目数
    pub fn pending_count_matching(&self, keep: impl Fn(&str) -> bool) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Pending && keep(&i.agent))
            .count()
    }

    /// 同一 agent 下该链接是否已有待处理条目（重复抓取时跳过）
    pub fn has_pending(&self, agent: &str, url: &str) -> bool {
        self.items
            .iter()
            .any(|i| i.status == ItemStatus::Pending && i.agent == agent && i.url == url)
    }

    pub fn remove(&mut self, id: &str) -> Result<QueueItem, SchedulerError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| SchedulerError::ItemNotFound(id.to_string()))?;
        Ok(self.items.remove(pos))
    }

    /// 清空队列，返回移除的条目数
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    pub fn mark_completed(&mut self, id: &str) -> Result<(), SchedulerError> {
        self.transition(id, ItemStatus::Completed)
    }

    pub fn mark_failed(&mut self, id: &str) -> Result<(), SchedulerError> {
        self.transition(id, ItemStatus::Failed)
    }

    fn transition(&mut self, id: &str, to: ItemStatus) -> Result<(), SchedulerError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| SchedulerError::ItemNotFound(id.to_string()))?;
        if item.status.is_terminal() {
            return Err(SchedulerError::InvalidTransition {
                id: id.to_string(),
                status: item.status,
            });
        }
        item.status = to;
        Ok(())
    }

    /// 按队列顺序取某 agent 的 pending 条目，最多 limit 条
    pub fn pending_for_agent(&self, agent: &str, limit: usize) -> Vec<QueueItem> {
        self.items
            .iter()
            .filter(|i| i.agent == agent && i.status == ItemStatus::Pending)
            .take(limit)
            .cloned()
            .collect()
    }

    /// 移除所有 completed 条目，返回移除数
    pub fn compact(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| i.status != ItemStatus::Completed);
        before - self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, link: &str) -> FeedEntry {
        FeedEntry {
            title: title.to_string(),
            link: link.to_string(),
            published_at: None,
        }
    }

    #[test]
    fn test_enqueue_assigns_unique_pending_ids() {
        let mut store = QueueStore::new();
        let a = store.enqueue(&entry("A", "https://a.com/1"), "news").unwrap();
        let b = store.enqueue(&entry("A", "https://a.com/1"), "news").unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("news_"));
        assert_eq!(a.status, ItemStatus::Pending);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_enqueue_rejects_incomplete_entry() {
        let mut store = QueueStore::new();
        assert!(matches!(
            store.enqueue(&entry("  ", "https://a.com/1"), "news"),
            Err(SchedulerError::IncompleteEntry)
        ));
        assert!(matches!(
            store.enqueue(&entry("Title", ""), "news"),
            Err(SchedulerError::IncompleteEntry)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_double_transition_rejected() {
        let mut store = QueueStore::new();
        let item = store.enqueue(&entry("A", "https://a.com/1"), "news").unwrap();
        store.mark_completed(&item.id).unwrap();
        let err = store.mark_failed(&item.id).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTransition { status: ItemStatus::Completed, .. }
        ));
        assert_eq!(store.get(&item.id).unwrap().status, ItemStatus::Completed);

        let other = store.enqueue(&entry("B", "https://a.com/2"), "news").unwrap();
        store.mark_failed(&other.id).unwrap();
        assert!(store.mark_completed(&other.id).is_err());
    }

    #[test]
    fn test_transition_unknown_id() {
        let mut store = QueueStore::new();
        assert!(matches!(
            store.mark_completed("missing"),
            Err(SchedulerError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = QueueStore::new();
        let a = store.enqueue(&entry("A", "https://a.com/1"), "news").unwrap();
        store.enqueue(&entry("B", "https://a.com/2"), "news").unwrap();
        store.enqueue(&entry("C", "https://a.com/3"), "news").unwrap();

        assert_eq!(store.remove(&a.id).unwrap().title, "A");
        assert!(matches!(store.remove(&a.id), Err(SchedulerError::ItemNotFound(_))));
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_pending_for_agent_respects_order_and_limit() {
        let mut store = QueueStore::new();
        let first = store.enqueue(&entry("1", "https://a.com/1"), "news").unwrap();
        store.enqueue(&entry("x", "https://b.com/1"), "tech").unwrap();
        let second = store.enqueue(&entry("2", "https://a.com/2"), "news").unwrap();
        store.enqueue(&entry("3", "https://a.com/3"), "news").unwrap();
        store.mark_failed(&first.id).unwrap();

        let picked = store.pending_for_agent("news", 1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, second.id);
        assert_eq!(store.pending_for_agent("news", 10).len(), 2);
    }

    #[test]
    fn test_compact_keeps_failed_and_pending() {
        let mut store = QueueStore::new();
        let a = store.enqueue(&entry("A", "https://a.com/1"), "news").unwrap();
        let b = store.enqueue(&entry("B", "https://a.com/2"), "news").unwrap();
        store.enqueue(&entry("C", "https://a.com/3"), "news").unwrap();
        store.mark_completed(&a.id).unwrap();
        store.mark_failed(&b.id).unwrap();

        assert_eq!(store.compact(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.list().iter().all(|i| i.status != ItemStatus::Completed));
        assert_eq!(store.get(&b.id).unwrap().status, ItemStatus::Failed);
    }

    #[test]
    fn test_has_pending() {
        let mut store = QueueStore::new();
        let a = store.enqueue(&entry("A", "https://a.com/1"), "news").unwrap();
        assert!(store.has_pending("news", "https://a.com/1"));
        assert!(!store.has_pending("tech", "https://a.com/1"));
        store.mark_failed(&a.id).unwrap();
        assert!(!store.has_pending("news", "https://a.com/1"));
    }
}
