//! 调度器：配置、抓取入队、队列操作与后台处理运行
//!
//! 同一时刻最多一次运行（single-flight）：start_run 在状态锁内检查并置位 is_processing，
//! 运行任务持有一个 guard，无论正常结束、单条失败、客户端构建失败还是 panic，guard 析构时都会清除标志。
//! 条目按 agent 配置顺序、队列顺序逐条处理；第 i 条分配给 channels[i % len]。

use std::sync::Arc;

use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};

use crate::core::activity_log::{LogEntry, LogKind};
use crate::core::error::{PipelineStep, SchedulerError};
use crate::core::pipeline::{ItemJob, ItemPipeline};
use crate::core::queue::{ItemStatus, QueueItem};
use crate::core::settings::PipelineConfig;
use crate::core::state::{SharedState, StatusSnapshot};
use crate::feed::{dedupe_recent, filter_by_domains, FeedSource};
use crate::integrations::CollaboratorFactory;

/// POST /rss/fetch 的结果
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub message: String,
    pub items_added: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    Completed {
        video_url: String,
        comment_url: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub item_id: String,
    pub title: String,
    pub agent: String,
    pub channel: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// 一次运行的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub items: Vec<ItemResult>,
    /// 运行结束时从队列移除的 completed 条目数
    pub removed: usize,
    /// 轮到处理时已不在队列中的条目数
    pub skipped: usize,
    /// 运行未能开始处理条目的原因（如客户端构建失败）
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Completed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.completed()
    }
}

/// 后台运行句柄；等待即可拿到 RunReport
pub struct RunHandle {
    handle: JoinHandle<RunReport>,
}

impl RunHandle {
    pub async fn wait(self) -> Result<RunReport, JoinError> {
        self.handle.await
    }
}

/// 运行结束时清除 is_processing；任务未走到 finish 就被丢弃（panic、运行时关闭）时记一条 error 日志
struct ProcessingGuard {
    state: SharedState,
    finished: bool,
}

impl ProcessingGuard {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut st = self.state.lock();
        st.is_processing = false;
        if !self.finished {
            st.log
                .error("Queue processing failed: run terminated before completion");
        }
    }
}

/// 第 i 条分配到 channels[i % len]；channels 为空时不分配
pub fn assign_round_robin<'a, T>(items: &'a [T], channels: &'a [String]) -> Vec<(&'a T, &'a str)> {
    if channels.is_empty() {
        return Vec::new();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (item, channels[i % channels.len()].as_str()))
        .collect()
}

#[derive(Clone)]
pub struct Scheduler {
    state: SharedState,
    feed: Arc<dyn FeedSource>,
    factory: Arc<dyn CollaboratorFactory>,
}

impl Scheduler {
    pub fn new(
        state: SharedState,
        feed: Arc<dyn FeedSource>,
        factory: Arc<dyn CollaboratorFactory>,
    ) -> Self {
        Self {
            state,
            feed,
            factory,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// 替换当前配置（调用方已校验）
    pub fn set_config(&self, config: PipelineConfig) {
        let mut st = self.state.lock();
        st.config = Some(Arc::new(config));
        st.log.info("Configuration updated");
    }

    pub fn config(&self) -> Option<Arc<PipelineConfig>> {
        self.state.lock().config.clone()
    }

    pub fn queue(&self) -> Vec<QueueItem> {
        self.state.lock().queue.list().to_vec()
    }

    pub fn remove_item(&self, id: &str) -> Result<QueueItem, SchedulerError> {
        let mut st = self.state.lock();
        let item = st.queue.remove(id)?;
        st.log.info(format!("Removed item {} from queue", id));
        Ok(item)
    }

    pub fn clear_queue(&self) -> usize {
        let mut st = self.state.lock();
        let count = st.queue.clear();
        st.log.info(format!("Cleared {} items from queue", count));
        count
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().log.entries()
    }

    /// 清空日志后写入一条 "Logs cleared"
    pub fn clear_logs(&self) -> usize {
        let mut st = self.state.lock();
        let count = st.log.clear();
        st.log.info("Logs cleared");
        count
    }

    pub fn status(&self) -> StatusSnapshot {
        self.state.snapshot()
    }

    pub fn is_processing(&self) -> bool {
        self.state.lock().is_processing
    }

    /// 抓取 → 去重 → 按 agent 路由 → 入队；同一 agent 已在队列中待处理的链接跳过
    pub async fn fetch_feed(&self) -> Result<FetchOutcome, SchedulerError> {
        let config = self.config().ok_or(SchedulerError::ConfigurationMissing)?;
        self.state.log(LogKind::Info, "Starting RSS feed fetch...");

        let entries = match self.feed.fetch(&config.rss.url, config.rss.max_fetch).await {
            Ok(entries) => entries,
            Err(e) => {
                let err = SchedulerError::Feed(e.to_string());
                self.state.log(LogKind::Error, err.to_string());
                return Err(err);
            }
        };
        let entries = dedupe_recent(entries, config.rss.dedupe_hours);
        if entries.is_empty() {
            self.state.log(LogKind::Info, "No fresh items found in RSS feed");
            return Ok(FetchOutcome {
                message: "No fresh items found".to_string(),
                items_added: 0,
            });
        }

        let mut items_added = 0;
        for (name, agent) in &config.agents {
            let pool = filter_by_domains(&entries, &agent.allowed_domains);
            let mut st = self.state.lock();
            if pool.is_empty() {
                st.log.info(format!("No items found for agent {}", name));
                continue;
            }
            for entry in &pool {
                if st.queue.has_pending(name, entry.link.trim()) {
                    continue;
                }
                match st.queue.enqueue(entry, name) {
                    Ok(_) => items_added += 1,
                    Err(e) => tracing::warn!(agent = %name, link = %entry.link, error = %e, "entry not enqueued"),
                }
            }
        }

        let message = format!("Added {} items to queue", items_added);
        self.state.log(LogKind::Success, message.clone());
        Ok(FetchOutcome {
            message,
            items_added,
        })
    }

    /// 启动一次后台运行；检查顺序：AlreadyRunning → EmptyQueue → ConfigurationMissing
    pub fn start_run(&self) -> Result<RunHandle, SchedulerError> {
        let config = {
            let mut st = self.state.lock();
            if st.is_processing {
                return Err(SchedulerError::AlreadyRunning);
            }
            // 已不在配置里的 agent 的条目不会被处理，不算待处理
            let pending = match &st.config {
                Some(cfg) => st.queue.pending_count_matching(|agent| cfg.agents.contains_key(agent)),
                None => st.queue.pending_count(),
            };
            if pending == 0 {
                return Err(SchedulerError::EmptyQueue);
            }
            let config = st.config.clone().ok_or(SchedulerError::ConfigurationMissing)?;
            st.is_processing = true;
            st.log.info("Started queue processing");
            config
        };

        let guard = ProcessingGuard {
            state: self.state.clone(),
            finished: false,
        };
        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            let report = scheduler.run(config).await;
            guard.finish();
            report
        });
        Ok(RunHandle { handle })
    }

    async fn run(&self, config: Arc<PipelineConfig>) -> RunReport {
        let mut report = RunReport::default();

        let collaborators = match self.factory.build(&config) {
            Ok(c) => c,
            Err(e) => {
                let err = SchedulerError::at(PipelineStep::Connect, e);
                self.state
                    .log(LogKind::Error, format!("Queue processing failed: {}", err));
                report.aborted = Some(err.to_string());
                return report;
            }
        };
        let pipeline = ItemPipeline::new(&collaborators, &config, &self.state);

        for (name, agent) in &config.agents {
            let picks = self
                .state
                .lock()
                .queue
                .pending_for_agent(name, config.quota_for(agent));
            if picks.is_empty() {
                self.state
                    .log(LogKind::Info, format!("No items found for agent {}", name));
                continue;
            }

            for (item, channel_label) in assign_round_robin(&picks, &agent.channels) {
                // 取出后可能已被手动移除或清空
                let still_pending = {
                    let st = self.state.lock();
                    st.queue
                        .get(&item.id)
                        .map_or(false, |i| i.status == ItemStatus::Pending)
                };
                if !still_pending {
                    self.state.log(
                        LogKind::Info,
                        format!("Skipped {}: no longer pending in queue", item.title),
                    );
                    report.skipped += 1;
                    continue;
                }

                let result = match config.channel(channel_label) {
                    Ok(channel) => {
                        let job = ItemJob {
                            item,
                            agent,
                            channel_label,
                            channel,
                        };
                        pipeline.run(&job).await
                    }
                    Err(e) => Err(e),
                };

                let mut st = self.state.lock();
                let (outcome, marked) = match result {
                    Ok(done) => (
                        ItemOutcome::Completed {
                            video_url: done.video_url,
                            comment_url: done.comment_url,
                        },
                        st.queue.mark_completed(&item.id),
                    ),
                    Err(e) => {
                        st.log
                            .error(format!("Failed to process {}: {}", item.title, e));
                        (
                            ItemOutcome::Failed {
                                error: e.to_string(),
                            },
                            st.queue.mark_failed(&item.id),
                        )
                    }
                };
                if let Err(e) = marked {
                    // 运行期间被手动移除或清空
                    tracing::warn!(item_id = %item.id, error = %e, "queue item changed during run");
                }
                report.items.push(ItemResult {
                    item_id: item.id.clone(),
                    title: item.title.clone(),
                    agent: name.clone(),
                    channel: channel_label.to_string(),
                    outcome,
                });
            }
        }

        let mut st = self.state.lock();
        report.removed = st.queue.compact();
        st.log.success("Queue processing completed");
        tracing::info!(
            completed = report.completed(),
            failed = report.failed(),
            removed = report.removed,
            skipped = report.skipped,
            "run finished"
        );
        report
    }
}
