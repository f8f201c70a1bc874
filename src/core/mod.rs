//! 核心编排层：配置模型、队列状态机、活动日志、共享状态、单条流水线、调度器与优雅关闭

pub mod activity_log;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;
pub mod settings;
pub mod shutdown;
pub mod state;

pub use activity_log::{ActivityLog, LogEntry, LogKind, DEFAULT_LOG_CAPACITY};
pub use error::{PipelineStep, SchedulerError};
pub use orchestrator::{assign_round_robin, FetchOutcome, ItemOutcome, ItemResult, RunHandle, RunReport, Scheduler};
pub use pipeline::{build_title, ItemJob, ItemPipeline, PipelineOutcome};
pub use queue::{ItemStatus, QueueItem, QueueStore};
pub use settings::PipelineConfig;
pub use shutdown::{RunDrainCleanup, ShutdownCleanup, ShutdownCoordinator, ShutdownManager, ShutdownReason};
pub use state::{SchedulerState, SharedState, StatusSnapshot};
