//! 外部协作方：视频生成（Creatify）、视频平台（YouTube）、评论生成（LLM）、推广下单（SMM 面板）
//!
//! 编排核心只依赖这里的 trait；每次运行开始时由 CollaboratorFactory 按当前配置构建一组实现。

pub mod comments;
pub mod creatify;
pub mod error;
pub mod smm;
#[cfg(test)]
pub(crate) mod testing;
pub mod youtube;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;

use crate::core::settings::{ChannelConfig, PipelineConfig};
use crate::llm::create_llm_from_config;

pub use comments::LlmCommentWriter;
pub use creatify::CreatifyClient;
pub use error::ClientError;
pub use smm::SmmClient;
pub use youtube::{comment_url, short_url, YoutubeClient};

/// 生成好的短视频
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    pub job_id: String,
    pub bytes: Bytes,
    pub filename: String,
    pub thumbnail_url: Option<String>,
    pub preview_url: Option<String>,
    pub editor_url: Option<String>,
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// 根据文章链接生成短视频；内部轮询任务直到终态或超时
    async fn generate_short(
        &self,
        article_url: &str,
        audience: &str,
    ) -> Result<GeneratedVideo, ClientError>;
}

/// 上传元数据
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: String,
    pub made_for_kids: bool,
    pub self_declared_made_for_kids: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedComment {
    pub comment_id: String,
    pub comment_url: String,
}

#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// 上传视频，返回 video id
    async fn upload(
        &self,
        channel: &str,
        config: &ChannelConfig,
        request: &UploadRequest,
    ) -> Result<String, ClientError>;

    /// 以频道身份发布置顶评论
    async fn post_top_comment(
        &self,
        channel: &str,
        config: &ChannelConfig,
        video_id: &str,
        text: &str,
    ) -> Result<PostedComment, ClientError>;

    fn video_url(&self, video_id: &str) -> String {
        short_url(video_id)
    }
}

/// 评论生成上下文
#[derive(Debug, Clone)]
pub struct CommentContext<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    /// 人设提示（agent label）
    pub persona_hint: Option<&'a str>,
}

#[async_trait]
pub trait CommentWriter: Send + Sync {
    async fn pinned_comment(&self, ctx: &CommentContext<'_>) -> Result<String, ClientError>;

    async fn reply_comments(
        &self,
        ctx: &CommentContext<'_>,
        count: usize,
    ) -> Result<Vec<String>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct BoostRequest<'a> {
    pub video_url: &'a str,
    pub pin_comment_url: Option<&'a str>,
    pub reply_comment_url: Option<&'a str>,
    pub reply_texts: &'a [String],
}

/// 服务名（views / likes / pin_likes / comments）→ 面板返回
pub type BoostReport = IndexMap<String, serde_json::Value>;

#[async_trait]
pub trait BoostClient: Send + Sync {
    async fn boost(&self, request: &BoostRequest<'_>) -> Result<BoostReport, ClientError>;
}

/// 一次运行使用的协作方集合
#[derive(Clone)]
pub struct Collaborators {
    pub video: Arc<dyn VideoGenerator>,
    pub platform: Arc<dyn VideoPlatform>,
    pub comments: Arc<dyn CommentWriter>,
    pub boost: Arc<dyn BoostClient>,
}

/// 按配置构建协作方；测试中替换为 mock
pub trait CollaboratorFactory: Send + Sync {
    fn build(&self, config: &PipelineConfig) -> Result<Collaborators, ClientError>;
}

/// 生产实现：HTTP 客户端
#[derive(Debug, Default)]
pub struct HttpCollaborators;

impl CollaboratorFactory for HttpCollaborators {
    fn build(&self, config: &PipelineConfig) -> Result<Collaborators, ClientError> {
        let video = CreatifyClient::from_config(&config.creatify)?;
        let llm = create_llm_from_config(&config.openai)?;
        Ok(Collaborators {
            video: Arc::new(video),
            platform: Arc::new(YoutubeClient::new()),
            comments: Arc::new(LlmCommentWriter::new(llm)),
            boost: Arc::new(SmmClient::from_config(&config.nuclearsmm)),
        })
    }
}
