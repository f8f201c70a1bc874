//! 一次性运行：读取流水线配置 → 抓取入队 → 处理一次 → 打印报告
//!
//! 用法: shortcast-run [pipeline.json|pipeline.toml]（默认 config.json）

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use shortcast::core::{ItemOutcome, PipelineConfig, Scheduler, SchedulerError, SharedState};
use shortcast::feed::HttpFeedSource;
use shortcast::integrations::HttpCollaborators;
use shortcast::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let config = PipelineConfig::load(&path)
        .with_context(|| format!("Failed to load pipeline config {}", path.display()))?;

    let scheduler = Scheduler::new(
        SharedState::default(),
        Arc::new(HttpFeedSource::default()),
        Arc::new(HttpCollaborators),
    );
    scheduler.set_config(config);

    let fetched = scheduler.fetch_feed().await.context("RSS fetch failed")?;
    println!("{}", fetched.message);

    let handle = match scheduler.start_run() {
        Ok(handle) => handle,
        Err(SchedulerError::EmptyQueue) => {
            println!("No fresh items.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to start run"),
    };
    let report = handle.wait().await.context("Run task panicked")?;

    if let Some(reason) = &report.aborted {
        anyhow::bail!("Run aborted: {}", reason);
    }
    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Completed {
                video_url,
                comment_url,
            } => println!(
                "[{} -> {}] Uploaded: {} (comment: {})",
                item.agent, item.channel, video_url, comment_url
            ),
            ItemOutcome::Failed { error } => println!(
                "[{} -> {}] Failed on {}: {}",
                item.agent, item.channel, item.title, error
            ),
        }
    }
    println!(
        "Done: {} completed, {} failed",
        report.completed(),
        report.failed()
    );
    Ok(())
}
