//! 流水线配置（POST /config 的载荷）
//!
//! 字段名与原控制台 JSON 保持兼容（categoryId、madeForKids 等）；agents 与 channels 保留配置顺序，
//! 编排器按此顺序处理 agent。加载时即做校验，运行期不再按字符串键取值。

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub agents: IndexMap<String, AgentConfig>,
    pub rss: RssConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    pub creatify: CreatifyConfig,
    pub nuclearsmm: SmmConfig,
    pub youtube: YoutubeConfig,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// agent：允许的来源域名 → 发布频道 + 受众描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub label: String,
    pub allowed_domains: Vec<String>,
    /// 频道标签，需在 youtube.channels 中存在
    pub channels: Vec<String>,
    #[serde(default)]
    pub target_audience: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    pub url: String,
    #[serde(default = "default_max_fetch")]
    pub max_fetch: usize,
    #[serde(default = "default_dedupe_hours")]
    pub dedupe_hours: u64,
}

fn default_max_fetch() -> usize {
    30
}

fn default_dedupe_hours() -> u64 {
    48
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// 存放 API Key 的环境变量名
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// 每条视频生成的回复评论数
    #[serde(default = "default_reply_count")]
    pub reply_count: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_key_env: default_openai_key_env(),
            base_url: None,
            reply_count: default_reply_count(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_reply_count() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatifyConfig {
    pub base_url: String,
    pub api_id_env: String,
    pub api_key_env: String,
    #[serde(default = "default_video_name")]
    pub video_name: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_job_timeout_secs")]
    pub timeout_secs: u64,
    /// 文案发音修正，按顺序尝试，第一条生效的规则即停止
    #[serde(default)]
    pub pronunciations: Vec<PronunciationRule>,
    #[serde(default)]
    pub defaults: CreatifyDefaults,
}

fn default_video_name() -> String {
    "Auto Short".to_string()
}

fn default_poll_interval_secs() -> u64 {
    8
}

fn default_job_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PronunciationRule {
    /// 正则
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatifyDefaults {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_video_length")]
    pub video_length: u32,
    #[serde(default = "default_script_style")]
    pub script_style: String,
    #[serde(default = "default_target_platform")]
    pub target_platform: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_visual_style")]
    pub visual_style: String,
    #[serde(default)]
    pub no_cta: bool,
    #[serde(default)]
    pub caption_setting: Option<serde_json::Value>,
}

impl Default for CreatifyDefaults {
    fn default() -> Self {
        Self {
            language: default_language(),
            video_length: default_video_length(),
            script_style: default_script_style(),
            target_platform: default_target_platform(),
            aspect_ratio: default_aspect_ratio(),
            visual_style: default_visual_style(),
            no_cta: false,
            caption_setting: None,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_video_length() -> u32 {
    15
}

fn default_script_style() -> String {
    "ThreeReasonsWriter".to_string()
}

fn default_target_platform() -> String {
    "youtube_shorts".to_string()
}

fn default_aspect_ratio() -> String {
    "9x16".to_string()
}

fn default_visual_style() -> String {
    "QuickTransitionTemplate".to_string()
}

/// 推广面板（SMM）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmmConfig {
    pub api_key: String,
    pub api_url: String,
    #[serde(default)]
    pub services: SmmServices,
    /// 两次下单之间的间隔
    #[serde(default = "default_order_delay_secs")]
    pub order_delay_secs: u64,
}

fn default_order_delay_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmmServices {
    #[serde(default)]
    pub views: Option<SmmService>,
    #[serde(default)]
    pub likes: Option<SmmService>,
    #[serde(default)]
    pub pin_likes: Option<SmmService>,
    #[serde(default)]
    pub comments: Option<SmmCommentService>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmmService {
    pub id: u64,
    pub qty: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmmCommentService {
    pub id: u64,
    pub qty: u64,
    /// "video"（默认）或 "comment"：评论下单目标
    #[serde(default)]
    pub target: Option<String>,
    /// 是否把生成的回复文本一起提交
    #[serde(default)]
    pub send_text: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    pub daily_per_channel: usize,
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,
    pub channels: IndexMap<String, ChannelConfig>,
}

fn default_title_max_len() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub client_secret_path: String,
    pub token_path: String,
    #[serde(default)]
    pub title_prefix: String,
    #[serde(default)]
    pub default_description: String,
    #[serde(default)]
    pub default_tags: Vec<String>,
    #[serde(rename = "categoryId", default = "default_category_id")]
    pub category_id: String,
    #[serde(default = "default_privacy")]
    pub privacy: String,
    #[serde(rename = "madeForKids", default)]
    pub made_for_kids: bool,
    #[serde(rename = "selfDeclaredMadeForKids", default)]
    pub self_declared_made_for_kids: bool,
}

fn default_category_id() -> String {
    // Science & Technology
    "28".to_string()
}

fn default_privacy() -> String {
    "public".to_string()
}

impl PipelineConfig {
    /// 从 JSON 解析并校验
    pub fn from_json(raw: &str) -> Result<Self, SchedulerError> {
        let cfg: PipelineConfig = serde_json::from_str(raw)
            .map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 从文件加载：.toml 按 TOML 解析，其余按 JSON
    pub fn load(path: &Path) -> Result<Self, SchedulerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SchedulerError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            let cfg: PipelineConfig =
                toml::from_str(&raw).map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;
            cfg.validate()?;
            Ok(cfg)
        } else {
            Self::from_json(&raw)
        }
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        let invalid = |msg: String| Err(SchedulerError::InvalidConfig(msg));

        if self.agents.is_empty() {
            return invalid("at least one agent is required".to_string());
        }
        if self.rss.url.trim().is_empty() {
            return invalid("rss.url is required".to_string());
        }
        if self.youtube.daily_per_channel == 0 {
            return invalid("youtube.daily_per_channel must be at least 1".to_string());
        }
        if self.youtube.title_max_len == 0 {
            return invalid("youtube.title_max_len must be at least 1".to_string());
        }
        if self.creatify.poll_interval_secs == 0 {
            return invalid("creatify.poll_interval_secs must be at least 1".to_string());
        }
        for (name, agent) in &self.agents {
            if name.trim().is_empty() {
                return invalid("agent name cannot be empty".to_string());
            }
            if agent.allowed_domains.iter().all(|d| d.trim().is_empty()) {
                return invalid(format!("agent '{}' has no allowed_domains", name));
            }
            if agent.channels.is_empty() {
                return invalid(format!("agent '{}' has no channels", name));
            }
            if let Some(missing) = agent
                .channels
                .iter()
                .find(|c| !self.youtube.channels.contains_key(c.as_str()))
            {
                return invalid(format!(
                    "agent '{}' references unknown channel '{}'",
                    name, missing
                ));
            }
        }
        for rule in &self.creatify.pronunciations {
            if let Err(e) = regex::Regex::new(&rule.pattern) {
                return invalid(format!("invalid pronunciation pattern '{}': {}", rule.pattern, e));
            }
        }
        Ok(())
    }

    pub fn channel(&self, label: &str) -> Result<&ChannelConfig, SchedulerError> {
        self.youtube
            .channels
            .get(label)
            .ok_or_else(|| SchedulerError::InvalidConfig(format!("unknown channel '{}'", label)))
    }

    /// 某 agent 单次运行最多处理的条目数
    pub fn quota_for(&self, agent: &AgentConfig) -> usize {
        self.youtube.daily_per_channel * agent.channels.len()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 单 agent、单频道的最小可用配置
    pub fn sample_config() -> PipelineConfig {
        let raw = serde_json::json!({
            "timezone": "America/Chicago",
            "agents": {
                "auto": {
                    "label": "Auto SEO Expert",
                    "allowed_domains": ["example.com"],
                    "channels": ["main"],
                    "target_audience": "car dealers"
                }
            },
            "rss": { "url": "https://feeds.example.com/rss" },
            "creatify": {
                "base_url": "https://api.creatify.test",
                "api_id_env": "CREATIFY_API_ID",
                "api_key_env": "CREATIFY_API_KEY"
            },
            "nuclearsmm": {
                "api_key": "k",
                "api_url": "https://smm.test/api/v2",
                "order_delay_secs": 0
            },
            "youtube": {
                "daily_per_channel": 1,
                "title_max_len": 40,
                "channels": {
                    "main": {
                        "client_secret_path": "secrets/main.json",
                        "token_path": "secrets/main_token.json",
                        "title_prefix": "Dealer Tips: ",
                        "default_description": "Daily automotive SEO",
                        "default_tags": ["seo", "auto"],
                        "categoryId": "28",
                        "privacy": "unlisted",
                        "madeForKids": false,
                        "selfDeclaredMadeForKids": false
                    }
                }
            }
        });
        let cfg: PipelineConfig = serde_json::from_value(raw).unwrap();
        cfg.validate().unwrap();
        cfg
    }
}
