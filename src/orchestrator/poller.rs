//! 批次轮询器 - 编排层
//!
//! 每次 tick 把当前批次的待处理列表与存储中的结果/状态逐个对账：
//! - 有结果：消费结果并计数
//! - 无结果但已超时：按失败计数，删除状态
//! - 其余：继续等待
//!
//! tick 之间不会并发，由调用方按固定间隔顺序驱动

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::{AppResult, CoordinationError};
use crate::infrastructure::SharedStore;
use crate::models::{SessionResults, WorkStatus};
use crate::services::work_records::{
    consume, load_pending, pending_key, read_result, read_status, save_pending, status_key,
};

/// 一次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 仍有订单未返回
    Pending { remaining: usize },
    /// 本批全部有结论
    Drained,
}

/// 单个批次的轮询器
#[derive(Debug)]
pub struct Poller {
    batch_index: usize,
    dispatched: usize,
    reconciled: usize,
    timeout: Duration,
    dispatched_at_ms: i64,
}

impl Poller {
    /// - `dispatched`: 本批实际派发的订单数
    /// - `dispatched_at_ms`: 派发时间，状态丢失的订单按它判断超时
    pub fn new(batch_index: usize, dispatched: usize, timeout: Duration, dispatched_at_ms: i64) -> Self {
        Self {
            batch_index,
            dispatched,
            reconciled: 0,
            timeout,
            dispatched_at_ms,
        }
    }

    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    /// 派发后尚未计数的订单数；协调失败时按它计入失败
    pub fn unresolved(&self) -> usize {
        self.dispatched.saturating_sub(self.reconciled)
    }

    /// 以当前时间执行一次对账
    pub async fn tick(
        &mut self,
        store: &dyn SharedStore,
        results: &mut SessionResults,
    ) -> AppResult<TickOutcome> {
        self.tick_at(store, results, Utc::now().timestamp_millis()).await
    }

    /// 以给定时间执行一次对账
    pub async fn tick_at(
        &mut self,
        store: &dyn SharedStore,
        results: &mut SessionResults,
        now_ms: i64,
    ) -> AppResult<TickOutcome> {
        let pending = match load_pending(store, self.batch_index).await {
            Ok(Some(pending)) => pending,
            Ok(None) if self.unresolved() == 0 => Vec::new(),
            Ok(None) => {
                let lost = CoordinationError::CorruptedPending {
                    key: pending_key(self.batch_index),
                    reason: format!("列表丢失，仍有 {} 个订单未对账", self.unresolved()),
                };
                error!("❌ 批次 {} 待处理列表无法读取: {}", self.batch_index + 1, lost);
                return Err(lost.into());
            }
            Err(e) => {
                error!("❌ 批次 {} 待处理列表无法读取: {}", self.batch_index + 1, e);
                return Err(e);
            }
        };
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let mut remaining = Vec::with_capacity(pending.len());

        for order_id in &pending {
            if let Some(result) = read_result(store, order_id).await? {
                consume(store, order_id).await?;
                results.record_result(&result);
                self.reconciled += 1;
                if !result.is_success() {
                    warn!(
                        "[订单 {}] ❌ 处理失败: {}",
                        order_id,
                        result.message.as_deref().unwrap_or("未知原因")
                    );
                } else if result.is_overcharge_error {
                    info!(
                        "[订单 {}] ⚠️ 疑似多收 GST: 实收 {} > 阈值 {} (差额 {})",
                        order_id, result.found, result.subtotal_threshold, result.monetary_difference
                    );
                } else {
                    info!("[订单 {}] ✓ GST 正常", order_id);
                }
                continue;
            }

            let status = read_status(store, order_id)
                .await?
                .unwrap_or_else(|| WorkStatus::pending_at(self.dispatched_at_ms));
            if status.is_expired(now_ms, timeout_ms) {
                let lost = CoordinationError::LostWorker {
                    order_id: order_id.clone(),
                    waited_ms: timeout_ms,
                };
                warn!("[订单 {}] ⏱️ {}", order_id, lost);
                store.delete(&status_key(order_id)).await?;
                results.record_failure();
                self.reconciled += 1;
                continue;
            }

            remaining.push(order_id.clone());
        }

        if remaining.len() != pending.len() {
            save_pending(store, self.batch_index, &remaining).await?;
        }

        debug!(
            "批次 {} 对账: 待处理 {} -> {}",
            self.batch_index + 1,
            pending.len(),
            remaining.len()
        );

        Ok(if remaining.is_empty() {
            TickOutcome::Drained
        } else {
            TickOutcome::Pending {
                remaining: remaining.len(),
            }
        })
    }
}
