//! Shortcast：新闻 RSS → 短视频 → YouTube 发布 → SMM 推广
//!
//! 模块划分：
//! - **api**: HTTP 接口（axum），控制台后端
//! - **config**: 服务配置加载（TOML + 环境变量）
//! - **core**: 流水线配置、队列状态机、活动日志、单条流水线、调度器、优雅关闭
//! - **feed**: RSS 抓取解析、时间窗去重、按域名路由
//! - **integrations**: 外部协作方（Creatify、YouTube、LLM 评论、SMM 面板）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: tracing 初始化

pub mod api;
pub mod config;
pub mod core;
pub mod feed;
pub mod integrations;
pub mod llm;
pub mod observability;

pub use crate::core::{PipelineConfig, Scheduler, SchedulerError, SharedState};
