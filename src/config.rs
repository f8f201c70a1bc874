//! 服务配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SHORTCAST__*` 覆盖（双下划线表示嵌套，如 `SHORTCAST__SERVER__PORT=9000`）。
//! 流水线配置（agents、频道、外部服务）不在这里，见 `core::settings::PipelineConfig`。

use std::path::PathBuf;

use serde::Deserialize;

/// 服务配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub activity: ActivitySection,
    pub bootstrap: BootstrapSection,
    pub schedule: ScheduleSection,
    pub shutdown: ShutdownSection,
}

/// [server] 段：监听地址与允许的跨域来源
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 控制台前端地址；为空时允许任意来源
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".into(),
        "http://localhost:3000".into(),
    ]
}

/// [activity] 段：活动日志保留条数
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySection {
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl Default for ActivitySection {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

fn default_log_capacity() -> usize {
    crate::core::DEFAULT_LOG_CAPACITY
}

/// [bootstrap] 段：启动时预加载的流水线配置（JSON 或 TOML）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapSection {
    pub pipeline_config: Option<PathBuf>,
}

/// [schedule] 段：定时抓取并处理
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    24 * 3600
}

/// [shutdown] 段：关闭时等待进行中运行的上限（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownSection {
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_drain_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// 监听端口；环境变量 SHORTCAST_PORT 优先
    pub fn port(&self) -> u16 {
        std::env::var("SHORTCAST_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(self.server.port)
    }
}

/// 从 config 目录加载配置，环境变量 SHORTCAST__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SHORTCAST__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SHORTCAST")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
