//! 进程内共享状态：配置、队列、活动日志、运行标志
//!
//! 四者放在同一把锁后面，保证 start_run 的检查与置位是原子的；锁不跨 .await 持有。

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::activity_log::{ActivityLog, LogKind};
use crate::core::queue::QueueStore;
use crate::core::settings::PipelineConfig;

#[derive(Debug, Default)]
pub struct SchedulerState {
    pub config: Option<Arc<PipelineConfig>>,
    pub queue: QueueStore,
    pub log: ActivityLog,
    pub is_processing: bool,
}

impl SchedulerState {
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            is_processing: self.is_processing,
            queue_count: self.queue.len(),
            logs_count: self.log.len(),
            has_config: self.config.is_some(),
            timestamp: Utc::now(),
        }
    }
}

/// GET /status 的返回体
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub is_processing: bool,
    pub queue_count: usize,
    pub logs_count: usize,
    pub has_config: bool,
    pub timestamp: DateTime<Utc>,
}

/// 可克隆的状态句柄
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<SchedulerState>>,
}

impl SharedState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerState {
                log: ActivityLog::new(log_capacity),
                ..SchedulerState::default()
            })),
        }
    }

    /// 加锁；持锁线程 panic 后仍可继续使用（状态本身始终一致）
    pub fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot()
    }

    /// 追加一条活动日志
    pub fn log(&self, kind: LogKind, message: impl Into<String>) {
        self.lock().log.push(kind, message);
    }
}
