//! 单元测试用的假协作方：记录每次调用，可按需注入失败

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

use crate::core::settings::{ChannelConfig, PipelineConfig};
use crate::integrations::{
    comment_url, BoostClient, BoostReport, BoostRequest, ClientError, CollaboratorFactory,
    Collaborators, CommentContext, CommentWriter, GeneratedVideo, PostedComment, UploadRequest,
    VideoGenerator, VideoPlatform,
};

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub channel: String,
    pub title: String,
    pub privacy: String,
    pub file: PathBuf,
    pub file_existed: bool,
}

#[derive(Debug, Clone)]
pub struct RecordedBoost {
    pub video_url: String,
    pub pin_comment_url: Option<String>,
    pub reply_texts: Vec<String>,
}

#[derive(Default)]
pub struct FakeStudio {
    /// 这些文章链接生成视频时失败
    pub fail_urls: Mutex<Vec<String>>,
    pub fail_upload: AtomicBool,
    pub audiences: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub boosts: Mutex<Vec<RecordedBoost>>,
    next_video: AtomicUsize,
}

impl FakeStudio {
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            video: self.clone(),
            platform: self.clone(),
            comments: self.clone(),
            boost: self.clone(),
        }
    }
}

#[async_trait]
impl VideoGenerator for FakeStudio {
    async fn generate_short(
        &self,
        article_url: &str,
        audience: &str,
    ) -> Result<GeneratedVideo, ClientError> {
        self.audiences.lock().unwrap().push(audience.to_string());
        if self.fail_urls.lock().unwrap().iter().any(|u| u == article_url) {
            return Err(ClientError::JobFailed {
                job: "job-x".to_string(),
                status: "failed".to_string(),
            });
        }
        Ok(GeneratedVideo {
            job_id: "job-1".to_string(),
            bytes: Bytes::from_static(b"video"),
            filename: "Auto_Short.mp4".to_string(),
            thumbnail_url: None,
            preview_url: None,
            editor_url: None,
        })
    }
}

#[async_trait]
impl VideoPlatform for FakeStudio {
    async fn upload(
        &self,
        channel: &str,
        _config: &ChannelConfig,
        request: &UploadRequest,
    ) -> Result<String, ClientError> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            channel: channel.to_string(),
            title: request.title.clone(),
            privacy: request.privacy.clone(),
            file: request.file.clone(),
            file_existed: request.file.exists(),
        });
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 403,
                body: "quotaExceeded".to_string(),
            });
        }
        let n = self.next_video.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("vid-{}", n))
    }

    async fn post_top_comment(
        &self,
        _channel: &str,
        _config: &ChannelConfig,
        video_id: &str,
        _text: &str,
    ) -> Result<PostedComment, ClientError> {
        let comment_id = format!("c-{}", video_id);
        Ok(PostedComment {
            comment_url: comment_url(video_id, &comment_id),
            comment_id,
        })
    }
}

#[async_trait]
impl CommentWriter for FakeStudio {
    async fn pinned_comment(&self, ctx: &CommentContext<'_>) -> Result<String, ClientError> {
        Ok(format!("Thoughts on {}?", ctx.title))
    }

    async fn reply_comments(
        &self,
        _ctx: &CommentContext<'_>,
        count: usize,
    ) -> Result<Vec<String>, ClientError> {
        Ok((1..=count).map(|i| format!("reply {}", i)).collect())
    }
}

#[async_trait]
impl BoostClient for FakeStudio {
    async fn boost(&self, request: &BoostRequest<'_>) -> Result<BoostReport, ClientError> {
        self.boosts.lock().unwrap().push(RecordedBoost {
            video_url: request.video_url.to_string(),
            pin_comment_url: request.pin_comment_url.map(str::to_string),
            reply_texts: request.reply_texts.to_vec(),
        });
        let mut report = BoostReport::new();
        report.insert("views".to_string(), json!({ "order": 1 }));
        Ok(report)
    }
}

/// 总是返回同一个 FakeStudio；broken 时构建失败
pub struct FakeFactory {
    pub studio: Arc<FakeStudio>,
    pub broken: bool,
}

impl CollaboratorFactory for FakeFactory {
    fn build(&self, _config: &PipelineConfig) -> Result<Collaborators, ClientError> {
        if self.broken {
            return Err(ClientError::Credentials("CREATIFY_API_ID not set".to_string()));
        }
        Ok(self.studio.collaborators())
    }
}
