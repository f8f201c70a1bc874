//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{CompletionOptions, LlmClient, Message, Role};

use crate::core::settings::OpenAiConfig;
use crate::integrations::ClientError;

/// 按配置创建 LLM 客户端；API Key 从 api_key_env 指定的环境变量读取
pub fn create_llm_from_config(cfg: &OpenAiConfig) -> Result<Arc<dyn LlmClient>, ClientError> {
    let api_key = std::env::var(&cfg.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ClientError::Credentials(format!("{} env var is not set", cfg.api_key_env)))?;
    tracing::debug!(model = %cfg.model, "using OpenAI-compatible comment model");
    Ok(Arc::new(OpenAiClient::new(
        cfg.base_url.as_deref(),
        &cfg.model,
        &api_key,
    )))
}
