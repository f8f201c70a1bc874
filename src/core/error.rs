//! 调度错误类型
//!
//! 请求入口（配置缺失、重复运行、空队列、条目不存在）与单条流水线失败（协作方失败、轮询超时）共用一套错误；
//! 后者只会在编排器内被捕获并把条目标记为 failed，不会中断整次运行。

use std::fmt;

use thiserror::Error;

use crate::core::queue::ItemStatus;
use crate::integrations::ClientError;

/// 单条流水线的步骤，用于定位协作方失败发生在哪一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    /// 按配置构建外部客户端
    Connect,
    GenerateVideo,
    StageFile,
    Upload,
    WriteComments,
    PostComment,
    Boost,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::Connect => "connect",
            PipelineStep::GenerateVideo => "generate_video",
            PipelineStep::StageFile => "stage_file",
            PipelineStep::Upload => "upload",
            PipelineStep::WriteComments => "write_comments",
            PipelineStep::PostComment => "post_comment",
            PipelineStep::Boost => "boost",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("No configuration found")]
    ConfigurationMissing,

    #[error("Queue is already being processed")]
    AlreadyRunning,

    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Item not found in queue: {0}")]
    ItemNotFound(String),

    #[error("Feed entry is missing a title or link")]
    IncompleteEntry,

    /// 条目已处于终态，拒绝二次迁移
    #[error("Item {id} is already {status}")]
    InvalidTransition { id: String, status: ItemStatus },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("RSS fetch failed: {0}")]
    Feed(String),

    #[error("{step} failed: {source}")]
    Collaborator {
        step: PipelineStep,
        #[source]
        source: ClientError,
    },

    #[error("Job {job} timed out (last status: {last_status})")]
    Timeout { job: String, last_status: String },
}

impl SchedulerError {
    /// 把客户端错误归到具体步骤；轮询超时单独提升为 Timeout
    pub fn at(step: PipelineStep, err: ClientError) -> Self {
        match err {
            ClientError::Timeout { job, last_status } => SchedulerError::Timeout { job, last_status },
            source => SchedulerError::Collaborator { step, source },
        }
    }

    /// 机器可读的错误种类（HTTP 错误体中的 `error` 字段）
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::ConfigurationMissing => "configuration_missing",
            SchedulerError::AlreadyRunning => "already_running",
            SchedulerError::EmptyQueue => "empty_queue",
            SchedulerError::ItemNotFound(_) => "item_not_found",
            SchedulerError::IncompleteEntry => "incomplete_entry",
            SchedulerError::InvalidTransition { .. } => "invalid_transition",
            SchedulerError::InvalidConfig(_) => "invalid_config",
            SchedulerError::Feed(_) => "feed_failure",
            SchedulerError::Collaborator { .. } => "collaborator_failure",
            SchedulerError::Timeout { .. } => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_promoted() {
        let err = SchedulerError::at(
            PipelineStep::GenerateVideo,
            ClientError::Timeout {
                job: "job-1".to_string(),
                last_status: "running".to_string(),
            },
        );
        assert!(matches!(err, SchedulerError::Timeout { ref job, .. } if job == "job-1"));
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_collaborator_message_names_step() {
        let err = SchedulerError::at(
            PipelineStep::Upload,
            ClientError::InvalidResponse("no id".to_string()),
        );
        assert_eq!(err.kind(), "collaborator_failure");
        assert!(err.to_string().starts_with("upload failed"));
    }
}
