//! Creatify 客户端：文章链接 → 文案 → 视频任务 → 轮询 → 下载
//!
//! 轮询只等待终态（done / failed / error / cancelled），不对失败重试；超过上限抛出 Timeout。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use serde_json::{json, Value};

use crate::core::settings::{CreatifyConfig, CreatifyDefaults};
use crate::integrations::{ClientError, GeneratedVideo, VideoGenerator};

const TERMINAL_STATUSES: [&str; 4] = ["done", "failed", "error", "cancelled"];

pub struct CreatifyClient {
    client: reqwest::Client,
    base_url: String,
    api_id: String,
    api_key: String,
    video_name: String,
    defaults: CreatifyDefaults,
    poll_interval: Duration,
    timeout: Duration,
    pronunciations: Vec<(Regex, String)>,
}

impl CreatifyClient {
    /// 凭证从配置指定的环境变量读取
    pub fn from_config(cfg: &CreatifyConfig) -> Result<Self, ClientError> {
        let api_id = std::env::var(&cfg.api_id_env).ok().filter(|v| !v.is_empty());
        let api_key = std::env::var(&cfg.api_key_env).ok().filter(|v| !v.is_empty());
        match (api_id, api_key) {
            (Some(id), Some(key)) => Self::with_credentials(cfg, id, key),
            _ => Err(ClientError::Credentials(format!(
                "Missing Creatify creds. Set {} and {}.",
                cfg.api_id_env, cfg.api_key_env
            ))),
        }
    }

    pub fn with_credentials(
        cfg: &CreatifyConfig,
        api_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let pronunciations = cfg
            .pronunciations
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.replacement.clone()))
                    .map_err(|e| ClientError::Parse(format!("pronunciation pattern: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_id: api_id.into(),
            api_key: api_key.into(),
            video_name: cfg.video_name.clone(),
            defaults: cfg.defaults.clone(),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            pronunciations,
        })
    }

    /// 覆盖轮询间隔与超时
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.timeout = timeout;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-API-ID", &self.api_id)
            .header("X-API-KEY", &self.api_key)
    }

    async fn send_json(&self, builder: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// 由文章链接生成文案
    pub async fn generate_script(&self, url: &str, audience: &str) -> Result<String, ClientError> {
        let body = json!({
            "url": url,
            "language": self.defaults.language,
            "video_length": self.defaults.video_length,
            "script_styles": [self.defaults.script_style],
            "target_audience": audience,
        });
        let data = self
            .send_json(self.request(reqwest::Method::POST, "/api/ai_scripts/").json(&body))
            .await?;
        extract_script(&data)
            .ok_or_else(|| ClientError::InvalidResponse("No script returned by /api/ai_scripts/".to_string()))
    }

    /// 依次尝试发音规则，第一条真正改动文本的规则生效（只替换首次出现）
    pub fn apply_pronunciations(&self, text: &str) -> String {
        for (re, replacement) in &self.pronunciations {
            let patched = re.replace(text, replacement.as_str());
            if patched != text {
                return patched.into_owned();
            }
        }
        text.to_string()
    }

    /// 创建 link_to_videos 任务，返回任务 JSON
    pub async fn create_video(
        &self,
        url: &str,
        audience: &str,
        override_script: Option<&str>,
    ) -> Result<Value, ClientError> {
        let d = &self.defaults;
        let body = json!({
            "link": url,
            "name": self.video_name,
            "target_platform": d.target_platform,
            "target_audience": audience,
            "language": d.language,
            "video_length": d.video_length,
            "aspect_ratio": d.aspect_ratio,
            "script_style": d.script_style,
            "visual_style": d.visual_style,
            "override_script": override_script,
            "no_cta": d.no_cta,
            "caption_setting": d.caption_setting,
        });
        self.send_json(self.request(reqwest::Method::POST, "/api/link_to_videos/").json(&body))
            .await
    }

    /// 轮询任务直到终态
    pub async fn wait_until_done(&self, job_id: &str) -> Result<Value, ClientError> {
        let start = Instant::now();
        loop {
            let data = self
                .send_json(self.request(
                    reqwest::Method::GET,
                    &format!("/api/link_to_videos/{}/", job_id),
                ))
                .await?;
            let status = data
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if TERMINAL_STATUSES.contains(&status.as_str()) {
                return Ok(data);
            }
            if start.elapsed() >= self.timeout {
                return Err(ClientError::Timeout {
                    job: job_id.to_string(),
                    last_status: status,
                });
            }
            tracing::debug!(job_id, status = %status, "creatify job still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes, ClientError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        Ok(resp.bytes().await?)
    }

    fn filename(&self) -> String {
        format!("{}.mp4", self.video_name.replace(' ', "_"))
    }
}

/// generated_scripts[0] 中依次取 paragraphs / script，都没有时退回整个对象
fn extract_script(data: &Value) -> Option<String> {
    let first = data.get("generated_scripts")?.as_array()?.first()?;
    let text = match (first.get("paragraphs"), first.get("script")) {
        (Some(Value::String(s)), _) if !s.is_empty() => s.clone(),
        (Some(Value::Array(parts)), _) if !parts.is_empty() => parts
            .iter()
            .map(|p| p.as_str().map(str::to_string).unwrap_or_else(|| p.to_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        (_, Some(Value::String(s))) if !s.is_empty() => s.clone(),
        _ => match first {
            Value::Object(map) if !map.is_empty() => first.to_string(),
            Value::String(s) => s.clone(),
            _ => String::new(),
        },
    };
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl VideoGenerator for CreatifyClient {
    async fn generate_short(
        &self,
        article_url: &str,
        audience: &str,
    ) -> Result<GeneratedVideo, ClientError> {
        let script = self.generate_script(article_url, audience).await?;
        let patched = self.apply_pronunciations(&script);

        let job = self.create_video(article_url, audience, Some(&patched)).await?;
        let job_id = job
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::InvalidResponse(format!("Creatify returned no job id: {}", job)))?
            .to_string();
        tracing::info!(job_id = %job_id, article_url, "creatify job created");

        let final_state = self.wait_until_done(&job_id).await?;
        let status = final_state
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if status != "done" {
            return Err(ClientError::JobFailed {
                job: job_id,
                status: status.to_string(),
            });
        }

        let text_field = |key: &str| {
            final_state
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let video_url = text_field("video_output")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ClientError::InvalidResponse(format!("No video_output in job: {}", final_state)))?;
        let bytes = self.download(&video_url).await?;

        Ok(GeneratedVideo {
            job_id,
            bytes,
            filename: self.filename(),
            thumbnail_url: text_field("video_thumbnail"),
            preview_url: text_field("preview"),
            editor_url: text_field("editor_url"),
        })
    }
}
