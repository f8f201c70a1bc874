//! 外部客户端错误

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    /// 轮询等待任务终态超时
    #[error("Job {job} timed out; last status={last_status}")]
    Timeout { job: String, last_status: String },

    /// 任务进入终态但不是成功
    #[error("Job {job} did not complete successfully: status={status}")]
    JobFailed { job: String, status: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// 非 2xx 响应转为 Api 错误（读取正文用于排查）
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        ClientError::Api { status, body }
    }
}
