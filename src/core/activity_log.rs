//! 活动日志：最近事件的环形缓冲
//!
//! 超出容量时按先进先出淘汰最旧条目；每次追加同时写入 tracing。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 默认容量
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// 日志类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// 单调递增，清空后也不回退，保证 id 不重复
    next_id: u64,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            LogKind::Error => tracing::error!(target: "activity", "{}", message),
            _ => tracing::info!(target: "activity", kind = ?kind, "{}", message),
        }

        let entry = LogEntry {
            id: self.next_id.to_string(),
            message,
            kind,
            timestamp: Utc::now(),
        };
        self.next_id += 1;

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogKind::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(LogKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogKind::Error, message);
    }

    /// 按时间顺序（最旧在前）返回所有条目
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_cap_evicts_oldest() {
        let mut log = ActivityLog::new(100);
        for i in 0..150 {
            log.info(format!("event {}", i));
        }
        assert_eq!(log.len(), 100);
        let entries = log.entries();
        assert_eq!(entries.first().unwrap().message, "event 50");
        assert_eq!(entries.last().unwrap().message, "event 149");
    }

    #[test]
    fn test_ids_unique_after_clear() {
        let mut log = ActivityLog::new(3);
        log.info("a");
        log.success("b");
        let before: Vec<String> = log.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(log.clear(), 2);
        assert!(log.is_empty());
        log.error("c");
        let after = log.entries();
        assert!(!before.contains(&after[0].id));
        assert_eq!(after[0].kind, LogKind::Error);
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let mut log = ActivityLog::default();
        log.success("uploaded");
        let json = serde_json::to_value(&log.entries()[0]).unwrap();
        assert_eq!(json["type"], "success");
        assert_eq!(json["message"], "uploaded");
    }
}
