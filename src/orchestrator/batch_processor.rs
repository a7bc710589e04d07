//! 批量订单处理器 - 编排层
//!
//! ## 职责
//!
//! 管理一次检查运行的完整生命周期：
//!
//! 1. **开始运行**：清理上次残留的记录，发现订单，派发第一批
//! 2. **分批派发**：每个订单先写 pending 状态，再打开后台视图，派发之间固定间隔
//! 3. **轮询对账**：按固定间隔驱动 `Poller`，直到本批全部有结论
//! 4. **手动节奏**：每批完成后等待操作员触发下一批
//! 5. **结束**：生成最终报告，之后不再修改任何状态
//!
//! ## 状态机
//!
//! ```text
//! Idle → Discovering → BatchDispatching → BatchPolling → BatchDone → {BatchDispatching | Finalized}
//! ```
//!
//! 协调失败（待处理列表损坏/无法读取）直接进入 `Finalized`，
//! 尚未有结论的订单全部计为失败

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, CoordinationError, DiscoveryError};
use crate::infrastructure::{OrderListing, SharedStore, ViewLauncher};
use crate::models::{FinalReport, SessionResults, WorkItem, WorkStatus};
use crate::orchestrator::poller::{Poller, TickOutcome};
use crate::services::discover;
use crate::services::work_records::{clear_run_keys, pending_key, save_pending, write_status};
use crate::utils::logging;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    BatchDispatching,
    BatchPolling,
    BatchDone,
    Finalized,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `start_run` / `run_next_batch` 返回后所处的阶段
#[derive(Debug, Clone, PartialEq)]
pub enum RunPhase {
    /// 一批已完成，等待操作员开始下一批
    AwaitingNextBatch {
        completed_batches: usize,
        total_batches: usize,
        next_batch_size: usize,
    },
    /// 运行已结束
    Finalized(FinalReport),
}

/// 批量订单处理器
///
/// 运行期间的所有计数只由这里持有和修改，worker 只通过共享存储回报
pub struct Orchestrator {
    store: Arc<dyn SharedStore>,
    listing: Arc<dyn OrderListing>,
    launcher: Arc<dyn ViewLauncher>,
    config: Config,
    state: RunState,
    items: Vec<WorkItem>,
    cursor: usize,
    results: SessionResults,
    report: Option<FinalReport>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SharedStore>,
        listing: Arc<dyn OrderListing>,
        launcher: Arc<dyn ViewLauncher>,
        mut config: Config,
    ) -> Self {
        config.batch_size = config.batch_size.max(1);
        Self {
            store,
            listing,
            launcher,
            config,
            state: RunState::Idle,
            items: Vec::new(),
            cursor: 0,
            results: SessionResults::default(),
            report: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// 已完成的批次数
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn results(&self) -> &SessionResults {
        &self.results
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// 批次总数
    pub fn total_batches(&self) -> usize {
        self.items.len().div_ceil(self.config.batch_size)
    }

    /// 开始一次新的运行，并处理第一批
    pub async fn start_run(&mut self) -> AppResult<RunPhase> {
        if !matches!(self.state, RunState::Idle | RunState::Finalized) {
            warn!("⚠️ 检查已在进行中 (状态: {})", self.state);
            return Err(CoordinationError::AlreadyRunning.into());
        }

        let removed = clear_run_keys(self.store.as_ref()).await?;
        if removed > 0 {
            info!("🧹 已清理上次运行残留的 {} 条记录", removed);
        }
        self.items.clear();
        self.cursor = 0;
        self.results = SessionResults::default();
        self.report = None;

        self.state = RunState::Discovering;
        let discovery = match discover(self.listing.as_ref(), &self.config.selectors).await {
            Ok(discovery) => discovery,
            Err(e) => {
                error!("❌ 订单发现失败: {}", e);
                self.state = RunState::Idle;
                return Err(e);
            }
        };

        if discovery.items.is_empty() {
            error!("❌ 没有找到可处理的订单 (列表条目: {})", discovery.entries_seen);
            self.state = RunState::Idle;
            return Err(DiscoveryError::NoWorkFound.into());
        }

        self.results.total_orders = discovery.entries_seen;
        self.results.record_failures(discovery.dropped.len());
        self.items = discovery.items;
        logging::log_orders_loaded(self.items.len(), discovery.entries_seen, self.config.batch_size);

        self.run_batch(0).await
    }

    /// 操作员触发：处理下一批
    pub async fn run_next_batch(&mut self) -> AppResult<RunPhase> {
        if self.state != RunState::BatchDone {
            return Err(CoordinationError::NotReadyForBatch {
                state: self.state.to_string(),
            }
            .into());
        }
        self.run_batch(self.cursor).await
    }

    /// 派发并轮询一个批次
    async fn run_batch(&mut self, index: usize) -> AppResult<RunPhase> {
        self.state = RunState::BatchDispatching;

        let total = self.items.len();
        let start = index * self.config.batch_size;
        let end = (start + self.config.batch_size).min(total);
        logging::log_batch_start(index + 1, self.total_batches(), start + 1, end, total);

        let dispatched_at_ms = Utc::now().timestamp_millis();
        let mut dispatched = Vec::with_capacity(end - start);

        for (offset, item) in self.items[start..end].iter().enumerate() {
            if offset > 0 {
                sleep(self.config.dispatch_delay()).await;
            }

            if let Err(e) = write_status(self.store.as_ref(), &item.id, &WorkStatus::pending_now()).await {
                error!("[订单 {}] ❌ 写入状态失败，不派发: {}", item.id, e);
                self.results.record_failure();
                continue;
            }

            info!("[订单 {}] 📂 打开详情页 ({}/{})", item.id, offset + 1, end - start);
            if let Err(e) = self.launcher.open_view(&item.locator, true).await {
                // 状态已写入，交给超时处理
                error!("[订单 {}] ❌ 打开详情页失败: {}", item.id, e);
            }
            dispatched.push(item.id.clone());
        }

        let mut poller = Poller::new(
            index,
            dispatched.len(),
            self.config.worker_timeout(),
            dispatched_at_ms,
        );

        if let Err(e) = save_pending(self.store.as_ref(), index, &dispatched).await {
            error!("❌ 批次 {} 待处理列表写入失败: {}", index + 1, e);
            return Ok(self.abort_batch(&poller));
        }

        self.state = RunState::BatchPolling;
        info!("⏳ 批次 {} 已派发 {} 个订单，等待结果...", index + 1, dispatched.len());

        match self.poll_until_drained(&mut poller).await {
            Ok(()) => Ok(self.on_batch_complete(index, dispatched.len()).await),
            Err(e) => {
                error!("❌ 批次 {} 轮询中止: {}", index + 1, e);
                Ok(self.abort_batch(&poller))
            }
        }
    }

    /// 按固定间隔顺序执行 tick，直到本批清空
    async fn poll_until_drained(&mut self, poller: &mut Poller) -> AppResult<()> {
        let period = self.config.poll_interval().max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match poller.tick(self.store.as_ref(), &mut self.results).await? {
                TickOutcome::Drained => return Ok(()),
                TickOutcome::Pending { remaining } => {
                    debug!("批次 {} 还有 {} 个订单未返回", poller.batch_index() + 1, remaining);
                }
            }
        }
    }

    async fn on_batch_complete(&mut self, index: usize, dispatched: usize) -> RunPhase {
        if let Err(e) = self.store.delete(&pending_key(index)).await {
            warn!("⚠️ 删除批次 {} 待处理列表失败: {}", index + 1, e);
        }
        logging::log_batch_complete(index + 1, dispatched);

        self.cursor += 1;
        self.state = RunState::BatchDone;

        let next_start = self.cursor * self.config.batch_size;
        if next_start >= self.items.len() {
            return RunPhase::Finalized(self.finalize());
        }

        let next_batch_size = (self.items.len() - next_start).min(self.config.batch_size);
        info!(
            "👉 可以开始第 {}/{} 批 ({} 个订单)",
            self.cursor + 1,
            self.total_batches(),
            next_batch_size
        );
        RunPhase::AwaitingNextBatch {
            completed_batches: self.cursor,
            total_batches: self.total_batches(),
            next_batch_size,
        }
    }

    /// 协调失败：未有结论的订单计为失败并立即结束
    fn abort_batch(&mut self, poller: &Poller) -> RunPhase {
        let unresolved = poller.unresolved();
        warn!("⚠️ {} 个订单按失败计入，提前结束检查", unresolved);
        self.results.record_failures(unresolved);
        RunPhase::Finalized(self.finalize())
    }

    /// 结束运行并生成最终报告；重复调用返回同一份报告
    pub fn finalize(&mut self) -> FinalReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        let report = FinalReport {
            results: self.results.clone(),
            successes: self.results.successes(),
            batches_outstanding: self.cursor < self.total_batches(),
        };
        self.state = RunState::Finalized;
        logging::print_final_stats(&report);
        self.report = Some(report.clone());
        report
    }
}
