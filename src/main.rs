//! Shortcast HTTP 服务
//!
//! 入口：加载服务配置、初始化日志、可选预加载流水线配置、可选定时运行，启动 axum 服务并处理优雅关闭。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shortcast::config::load_config;
use shortcast::core::{
    PipelineConfig, RunDrainCleanup, Scheduler, SchedulerError, SharedState, ShutdownCoordinator,
    ShutdownManager, ShutdownReason,
};
use shortcast::feed::HttpFeedSource;
use shortcast::integrations::HttpCollaborators;
use shortcast::{api, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load service config")?;

    let state = SharedState::new(cfg.activity.capacity);
    let scheduler = Scheduler::new(
        state.clone(),
        Arc::new(HttpFeedSource::default()),
        Arc::new(HttpCollaborators),
    );

    if let Some(path) = &cfg.bootstrap.pipeline_config {
        let pipeline = PipelineConfig::load(path)
            .with_context(|| format!("Failed to load pipeline config {}", path.display()))?;
        scheduler.set_config(pipeline);
        tracing::info!("pipeline config loaded from {}", path.display());
    }

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    // 定时运行：先抓取入队，再启动一次处理；已有运行时跳过
    if cfg.schedule.enabled {
        let periodic = scheduler.clone();
        let token = shutdown.token();
        let interval_secs = cfg.schedule.interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => scheduled_run(&periodic).await,
                }
            }
        });
        tracing::info!("schedule enabled, interval {}s", interval_secs);
    }

    let app = api::router(scheduler, &cfg.server.cors_origins);
    let host: std::net::IpAddr = cfg
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server.host {}", cfg.server.host))?;
    let addr = SocketAddr::new(host, cfg.port());
    tracing::info!("Shortcast API: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait_for_shutdown().await })
        .await;
    if !shutdown.is_shutdown() {
        shutdown.shutdown(ShutdownReason::ServerExited);
    }

    let mut coordinator =
        ShutdownCoordinator::new(shutdown).with_timeout(cfg.shutdown.drain_timeout_secs);
    coordinator.register(RunDrainCleanup::new(state));
    coordinator.run_cleanup().await;

    served.context("HTTP server failed")?;
    Ok(())
}

async fn scheduled_run(scheduler: &Scheduler) {
    match scheduler.fetch_feed().await {
        Ok(outcome) => tracing::info!(items_added = outcome.items_added, "scheduled fetch done"),
        Err(SchedulerError::ConfigurationMissing) => {
            tracing::info!("scheduled run skipped: no configuration");
            return;
        }
        Err(e) => tracing::warn!("scheduled fetch failed: {}", e),
    }
    match scheduler.start_run() {
        Ok(_) => tracing::info!("scheduled run started"),
        Err(SchedulerError::AlreadyRunning) => tracing::info!("scheduled run skipped: already running"),
        Err(e) => tracing::info!("scheduled run not started: {}", e),
    }
}
