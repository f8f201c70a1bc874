//! 集成测试共用的假协作方与配置

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower::ServiceExt;

use shortcast::core::settings::{ChannelConfig, PipelineConfig};
use shortcast::core::{Scheduler, SharedState};
use shortcast::feed::{FeedEntry, FeedSource};
use shortcast::integrations::{
    comment_url, BoostClient, BoostReport, BoostRequest, ClientError, CollaboratorFactory,
    Collaborators, CommentContext, CommentWriter, GeneratedVideo, PostedComment, UploadRequest,
    VideoGenerator, VideoPlatform,
};

/// 单 agent（auto → example.com）、频道 main、每频道配额 1
pub fn pipeline_json() -> Value {
    json!({
        "timezone": "UTC",
        "agents": {
            "auto": {
                "label": "Auto SEO Expert",
                "allowed_domains": ["example.com"],
                "channels": ["main"],
                "target_audience": "car dealers"
            }
        },
        "rss": { "url": "https://feeds.example.com/rss", "max_fetch": 30, "dedupe_hours": 48 },
        "openai": { "model": "gpt-4o-mini" },
        "creatify": {
            "base_url": "https://api.creatify.test",
            "api_id_env": "CREATIFY_API_ID",
            "api_key_env": "CREATIFY_API_KEY"
        },
        "nuclearsmm": { "api_key": "k", "api_url": "https://smm.test/api/v2", "order_delay_secs": 0 },
        "youtube": {
            "daily_per_channel": 1,
            "title_max_len": 100,
            "channels": {
                "main": {
                    "client_secret_path": "secrets/main.json",
                    "token_path": "secrets/main_token.json",
                    "title_prefix": "Dealer Tips: ",
                    "default_description": "Daily automotive SEO",
                    "default_tags": ["seo"]
                },
                "second": {
                    "client_secret_path": "secrets/second.json",
                    "token_path": "secrets/second_token.json",
                    "title_prefix": "More Tips: "
                }
            }
        }
    })
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig::from_json(&pipeline_json().to_string()).unwrap()
}

pub fn entry(title: &str, link: &str) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: link.to_string(),
        published_at: Some(chrono::Utc::now()),
    }
}

#[derive(Default)]
pub struct StaticFeed {
    pub entries: Mutex<Vec<FeedEntry>>,
    pub fail: AtomicBool,
}

impl StaticFeed {
    pub fn with(entries: Vec<FeedEntry>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(entries),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self, _url: &str, max_items: usize) -> Result<Vec<FeedEntry>, ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 503,
                body: "feed down".to_string(),
            });
        }
        Ok(self.entries.lock().unwrap().iter().take(max_items).cloned().collect())
    }
}

/// 假协作方；gated 时每次生成视频都要先拿到一个许可，用来把运行卡在进行中
pub struct Studio {
    pub gate: Option<Semaphore>,
    pub uploads: Mutex<Vec<(String, String)>>,
    pub boosted: AtomicUsize,
    next_video: AtomicUsize,
}

impl Studio {
    fn new(gate: Option<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            gate,
            uploads: Mutex::new(Vec::new()),
            boosted: AtomicUsize::new(0),
            next_video: AtomicUsize::new(0),
        })
    }

    pub fn open() -> Arc<Self> {
        Self::new(None)
    }

    pub fn gated() -> Arc<Self> {
        Self::new(Some(Semaphore::new(0)))
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    /// 已上传的 (频道, 标题)
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoGenerator for Studio {
    async fn generate_short(&self, _url: &str, _audience: &str) -> Result<GeneratedVideo, ClientError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(GeneratedVideo {
            job_id: "job".to_string(),
            bytes: Bytes::from_static(b"mp4"),
            filename: "Auto_Short.mp4".to_string(),
            thumbnail_url: None,
            preview_url: None,
            editor_url: None,
        })
    }
}

#[async_trait]
impl VideoPlatform for Studio {
    async fn upload(
        &self,
        channel: &str,
        _config: &ChannelConfig,
        request: &UploadRequest,
    ) -> Result<String, ClientError> {
        self.uploads
            .lock()
            .unwrap()
            .push((channel.to_string(), request.title.clone()));
        let n = self.next_video.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("v{}", n))
    }

    async fn post_top_comment(
        &self,
        _channel: &str,
        _config: &ChannelConfig,
        video_id: &str,
        _text: &str,
    ) -> Result<PostedComment, ClientError> {
        Ok(PostedComment {
            comment_id: "c1".to_string(),
            comment_url: comment_url(video_id, "c1"),
        })
    }
}

#[async_trait]
impl CommentWriter for Studio {
    async fn pinned_comment(&self, _ctx: &CommentContext<'_>) -> Result<String, ClientError> {
        Ok("What would you add?".to_string())
    }

    async fn reply_comments(
        &self,
        _ctx: &CommentContext<'_>,
        count: usize,
    ) -> Result<Vec<String>, ClientError> {
        Ok(vec!["Great tip".to_string(); count])
    }
}

#[async_trait]
impl BoostClient for Studio {
    async fn boost(&self, _request: &BoostRequest<'_>) -> Result<BoostReport, ClientError> {
        self.boosted.fetch_add(1, Ordering::SeqCst);
        Ok(BoostReport::new())
    }
}

pub struct StudioFactory(pub Arc<Studio>);

impl CollaboratorFactory for StudioFactory {
    fn build(&self, _config: &PipelineConfig) -> Result<Collaborators, ClientError> {
        Ok(Collaborators {
            video: self.0.clone(),
            platform: self.0.clone(),
            comments: self.0.clone(),
            boost: self.0.clone(),
        })
    }
}

pub fn scheduler(feed: Arc<StaticFeed>, studio: Arc<Studio>) -> Scheduler {
    Scheduler::new(SharedState::new(100), feed, Arc::new(StudioFactory(studio)))
}

/// 发送一次请求，返回状态码与 JSON 正文
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
