//! SMM 推广面板客户端（标准 v2 接口：form POST key/action/service/link/quantity）
//!
//! 下单顺序固定：views → likes → pin_likes → comments，每单之间间隔 order_delay。
//! 面板返回非 JSON 时原样记录为 {"error": 正文}，不视为失败。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::settings::{SmmConfig, SmmServices};
use crate::integrations::{BoostClient, BoostReport, BoostRequest, ClientError};

pub struct SmmClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    services: SmmServices,
    order_delay: Duration,
}

impl SmmClient {
    pub fn from_config(cfg: &SmmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: cfg.api_key.clone(),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            services: cfg.services.clone(),
            order_delay: Duration::from_secs(cfg.order_delay_secs),
        }
    }

    /// 下一单；comments 为自定义评论文本（换行分隔）
    pub async fn place_order(
        &self,
        service_id: u64,
        link: &str,
        quantity: u64,
        comments: Option<&str>,
    ) -> Result<Value, ClientError> {
        let service = service_id.to_string();
        let quantity = quantity.to_string();
        let mut form = vec![
            ("key", self.api_key.as_str()),
            ("action", "add"),
            ("service", service.as_str()),
            ("link", link),
            ("quantity", quantity.as_str()),
        ];
        if let Some(text) = comments {
            form.push(("comments", text));
        }

        let resp = self.client.post(&self.api_url).form(&form).send().await?;
        let body = resp.text().await?;
        let value = serde_json::from_str(&body).unwrap_or_else(|_| json!({ "error": body }));
        tracing::info!(service = service_id, link, response = %value, "smm order placed");
        Ok(value)
    }

    async fn pause(&self) {
        if !self.order_delay.is_zero() {
            tokio::time::sleep(self.order_delay).await;
        }
    }
}

#[async_trait]
impl BoostClient for SmmClient {
    async fn boost(&self, request: &BoostRequest<'_>) -> Result<BoostReport, ClientError> {
        let mut report = BoostReport::new();

        if let Some(svc) = &self.services.views {
            let res = self.place_order(svc.id, request.video_url, svc.qty, None).await?;
            report.insert("views".to_string(), res);
            self.pause().await;
        }

        if let Some(svc) = &self.services.likes {
            let res = self.place_order(svc.id, request.video_url, svc.qty, None).await?;
            report.insert("likes".to_string(), res);
            self.pause().await;
        }

        match (&self.services.pin_likes, request.pin_comment_url) {
            (Some(svc), Some(url)) => {
                let res = self.place_order(svc.id, url, svc.qty, None).await?;
                report.insert("pin_likes".to_string(), res);
                self.pause().await;
            }
            _ => {
                report.insert(
                    "pin_likes".to_string(),
                    json!({ "skipped": "no comment URL provided" }),
                );
            }
        }

        if let Some(svc) = &self.services.comments {
            let link = match (svc.target.as_deref(), request.reply_comment_url) {
                (Some("comment"), Some(url)) => url,
                _ => request.video_url,
            };
            let text = (svc.send_text && !request.reply_texts.is_empty())
                .then(|| request.reply_texts.join("\n"));
            let res = self.place_order(svc.id, link, svc.qty, text.as_deref()).await?;
            report.insert("comments".to_string(), res);
        }

        Ok(report)
    }
}
