//! 单条流水线：生成视频 → 落盘 → 上传 → 评论 → 推广
//!
//! 步骤严格顺序执行，任一步失败即中止本条目并返回带步骤的错误。
//! 视频文件写入作用域内的临时目录，任何退出路径上都会随 TempDir 析构删除。

use std::path::Path;

use serde::Serialize;
use tempfile::TempDir;

use crate::core::activity_log::LogKind;
use crate::core::error::{PipelineStep, SchedulerError};
use crate::core::queue::QueueItem;
use crate::core::settings::{AgentConfig, ChannelConfig, PipelineConfig};
use crate::core::state::SharedState;
use crate::integrations::{
    BoostReport, BoostRequest, Collaborators, CommentContext, GeneratedVideo, UploadRequest,
};

/// 一次处理的输入：条目 + 所属 agent + 分配到的频道
pub struct ItemJob<'a> {
    pub item: &'a QueueItem,
    pub agent: &'a AgentConfig,
    pub channel_label: &'a str,
    pub channel: &'a ChannelConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub video_id: String,
    pub video_url: String,
    pub comment_url: String,
    pub boost: BoostReport,
}

pub struct ItemPipeline<'a> {
    collaborators: &'a Collaborators,
    config: &'a PipelineConfig,
    state: &'a SharedState,
}

/// 临时目录中的视频文件；析构时整个目录被删除
struct StagedVideo {
    dir: TempDir,
    file_name: String,
}

impl StagedVideo {
    async fn write(video: &GeneratedVideo) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("creatify_").tempdir()?;
        tokio::fs::write(dir.path().join(&video.filename), &video.bytes).await?;
        Ok(Self {
            dir,
            file_name: video.filename.clone(),
        })
    }

    fn path(&self) -> std::path::PathBuf {
        self.dir.path().join(&self.file_name)
    }
}

/// 标题 = 前缀 + 文件名主干，按字符数截断
pub fn build_title(prefix: &str, filename: &str, max_len: usize) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    format!("{}{}", prefix, stem).chars().take(max_len).collect()
}

impl<'a> ItemPipeline<'a> {
    pub fn new(
        collaborators: &'a Collaborators,
        config: &'a PipelineConfig,
        state: &'a SharedState,
    ) -> Self {
        Self {
            collaborators,
            config,
            state,
        }
    }

    pub async fn run(&self, job: &ItemJob<'_>) -> Result<PipelineOutcome, SchedulerError> {
        let ItemJob {
            item,
            agent,
            channel_label,
            channel,
        } = *job;
        self.state.log(
            LogKind::Info,
            format!("Processing: {} ({} -> {})", item.title, agent.label, channel_label),
        );

        let video = self
            .collaborators
            .video
            .generate_short(&item.url, &agent.target_audience)
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::GenerateVideo, e))?;

        let staged = StagedVideo::write(&video)
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::StageFile, e.into()))?;

        let title = build_title(&channel.title_prefix, &video.filename, self.config.youtube.title_max_len);
        let request = UploadRequest {
            file: staged.path(),
            title: title.clone(),
            description: channel.default_description.clone(),
            tags: channel.default_tags.clone(),
            category_id: channel.category_id.clone(),
            privacy: channel.privacy.clone(),
            made_for_kids: channel.made_for_kids,
            self_declared_made_for_kids: channel.self_declared_made_for_kids,
        };
        let platform = &self.collaborators.platform;
        let video_id = platform
            .upload(channel_label, channel, &request)
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::Upload, e))?;
        let video_url = platform.video_url(&video_id);
        self.state.log(LogKind::Success, format!("Uploaded: {}", video_url));

        let ctx = CommentContext {
            title: &title,
            description: &channel.default_description,
            tags: &channel.default_tags,
            persona_hint: Some(&agent.label),
        };
        let comments = &self.collaborators.comments;
        let pinned = comments
            .pinned_comment(&ctx)
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::WriteComments, e))?;
        let replies = comments
            .reply_comments(&ctx, self.config.openai.reply_count)
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::WriteComments, e))?;

        let posted = platform
            .post_top_comment(channel_label, channel, &video_id, &pinned)
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::PostComment, e))?;
        self.state.log(
            LogKind::Info,
            format!("Posted author comment: {}", posted.comment_url),
        );

        let boost = self
            .collaborators
            .boost
            .boost(&BoostRequest {
                video_url: &video_url,
                pin_comment_url: Some(&posted.comment_url),
                reply_comment_url: Some(&posted.comment_url),
                reply_texts: &replies,
            })
            .await
            .map_err(|e| SchedulerError::at(PipelineStep::Boost, e))?;
        self.state.log(
            LogKind::Info,
            format!(
                "SMM boost results: {}",
                serde_json::to_string(&boost).unwrap_or_default()
            ),
        );

        drop(staged);
        Ok(PipelineOutcome {
            video_id,
            video_url,
            comment_url: posted.comment_url,
            boost,
        })
    }
}
