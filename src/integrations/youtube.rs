//! YouTube Data API v3：可续传上传 + 顶层评论
//!
//! 每个频道使用已授权的用户令牌文件（access token + refresh token）。令牌过期时用 refresh token
//! 换新并写回文件；首次授权（浏览器同意流程）不在此处完成。

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::settings::ChannelConfig;
use crate::integrations::{ClientError, PostedComment, UploadRequest, VideoPlatform};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// 距过期不足该秒数即视为过期
const EXPIRY_SKEW_SECS: i64 = 60;

pub fn short_url(video_id: &str) -> String {
    format!("https://youtube.com/shorts/{}", video_id)
}

pub fn comment_url(video_id: &str, comment_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}&lc={}", video_id, comment_id)
}

/// authorized-user 令牌文件
#[derive(Debug, Default, Deserialize)]
struct TokenFile {
    #[serde(alias = "access_token")]
    token: Option<String>,
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
    expiry: Option<String>,
}

/// client secret 文件（installed 或 web 应用）
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map_or(true, |at| at - chrono::Duration::seconds(EXPIRY_SKEW_SECS) > now)
    }
}

pub struct YoutubeClient {
    client: reqwest::Client,
    api_base: String,
    /// 频道标签 → access token
    tokens: Mutex<HashMap<String, CachedToken>>,
}

impl Default for YoutubeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YoutubeClient {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, channel: &str) -> Option<CachedToken> {
        let tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens
            .get(channel)
            .filter(|t| t.is_fresh(Utc::now()))
            .cloned()
    }

    fn remember(&self, channel: &str, token: CachedToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.insert(channel.to_string(), token);
    }

    /// 取可用的 access token：缓存 → 令牌文件 → refresh
    async fn access_token(&self, channel: &str, config: &ChannelConfig) -> Result<String, ClientError> {
        if let Some(token) = self.cached(channel) {
            return Ok(token.access_token);
        }

        let token_path = Path::new(&config.token_path);
        let raw = tokio::fs::read_to_string(token_path).await.map_err(|e| {
            ClientError::Credentials(format!(
                "channel '{}' is not authorized (token file {}: {})",
                channel, config.token_path, e
            ))
        })?;
        let file: TokenFile = serde_json::from_str(&raw)
            .map_err(|e| ClientError::Parse(format!("token file {}: {}", config.token_path, e)))?;

        if let Some(access_token) = file.token.clone().filter(|t| !t.is_empty()) {
            let cached = CachedToken {
                access_token,
                expires_at: file.expiry.as_deref().and_then(parse_expiry),
            };
            if cached.is_fresh(Utc::now()) {
                self.remember(channel, cached.clone());
                return Ok(cached.access_token);
            }
        }

        let refreshed = self.refresh(channel, config, &file).await?;
        persist_refreshed(token_path, &raw, &refreshed).await;
        self.remember(channel, refreshed.clone());
        Ok(refreshed.access_token)
    }

    async fn refresh(
        &self,
        channel: &str,
        config: &ChannelConfig,
        file: &TokenFile,
    ) -> Result<CachedToken, ClientError> {
        let refresh_token = file.refresh_token.as_deref().ok_or_else(|| {
            ClientError::Credentials(format!(
                "channel '{}' token expired and has no refresh_token",
                channel
            ))
        })?;

        let (client_id, client_secret, token_uri) = match (&file.client_id, &file.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone(), file.token_uri.clone()),
            _ => {
                let secret = read_client_secret(&config.client_secret_path).await?;
                let uri = file.token_uri.clone().or(secret.token_uri);
                (secret.client_id, secret.client_secret, uri)
            }
        };
        let token_uri = token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        tracing::info!(channel, "refreshing youtube access token");
        let resp = self
            .client
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        let body: RefreshResponse = resp.json().await?;
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: body
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        })
    }

    async fn send_json(&self, builder: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        Ok(resp.json().await?)
    }
}

async fn read_client_secret(path: &str) -> Result<ClientSecret, ClientError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ClientError::Credentials(format!("client secret {}: {}", path, e)))?;
    let file: ClientSecretFile = serde_json::from_str(&raw)
        .map_err(|e| ClientError::Parse(format!("client secret {}: {}", path, e)))?;
    file.installed
        .or(file.web)
        .ok_or_else(|| ClientError::Credentials(format!("client secret {} has no installed/web entry", path)))
}

/// 新 token 写回令牌文件；写失败只记日志
async fn persist_refreshed(path: &Path, raw: &str, token: &CachedToken) {
    let mut value: Value = serde_json::from_str(raw).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert("token".to_string(), json!(token.access_token));
        if let Some(at) = token.expires_at {
            obj.insert("expiry".to_string(), json!(at.to_rfc3339()));
        }
    }
    let text = serde_json::to_string_pretty(&value).unwrap_or_default();
    if let Err(e) = tokio::fs::write(path, text).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to persist refreshed token");
    }
}

/// RFC 3339，或不带时区的 ISO 时间（按 UTC）
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

#[async_trait]
impl VideoPlatform for YoutubeClient {
    async fn upload(
        &self,
        channel: &str,
        config: &ChannelConfig,
        request: &UploadRequest,
    ) -> Result<String, ClientError> {
        let token = self.access_token(channel, config).await?;
        let bytes = tokio::fs::read(&request.file).await?;

        let metadata = json!({
            "snippet": {
                "title": request.title,
                "description": request.description,
                "tags": request.tags,
                "categoryId": request.category_id,
            },
            "status": {
                "privacyStatus": request.privacy,
                "selfDeclaredMadeForKids": request.self_declared_made_for_kids,
                "madeForKids": request.made_for_kids,
            }
        });

        let init = self
            .client
            .post(format!(
                "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
                self.api_base
            ))
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", bytes.len())
            .json(&metadata)
            .send()
            .await?;
        if !init.status().is_success() {
            return Err(ClientError::from_response(init).await);
        }
        let session = init
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidResponse("upload session has no Location header".to_string()))?;

        let body = self
            .send_json(
                self.client
                    .put(&session)
                    .bearer_auth(&token)
                    .header(reqwest::header::CONTENT_TYPE, "video/*")
                    .body(bytes),
            )
            .await?;
        let video_id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidResponse(format!("upload response has no id: {}", body)))?;
        tracing::info!(channel, video_id, "video uploaded");
        Ok(video_id.to_string())
    }

    async fn post_top_comment(
        &self,
        channel: &str,
        config: &ChannelConfig,
        video_id: &str,
        text: &str,
    ) -> Result<PostedComment, ClientError> {
        let token = self.access_token(channel, config).await?;
        let body = json!({
            "snippet": {
                "videoId": video_id,
                "topLevelComment": { "snippet": { "textOriginal": text } }
            }
        });
        let resp = self
            .send_json(
                self.client
                    .post(format!("{}/youtube/v3/commentThreads?part=snippet", self.api_base))
                    .bearer_auth(&token)
                    .json(&body),
            )
            .await?;
        let comment_id = resp
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidResponse(format!("comment response has no id: {}", resp)))?;
        Ok(PostedComment {
            comment_id: comment_id.to_string(),
            comment_url: comment_url(video_id, comment_id),
        })
    }
}
