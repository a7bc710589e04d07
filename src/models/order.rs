//! 订单相关的数据结构
//!
//! `WorkStatus` / `WorkResult` 会写入共享存储，字段名保持 camelCase

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::money::Money;

/// 一个待检查的订单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 订单号，整个运行中唯一
    pub id: String,
    /// 详情页地址
    pub locator: Url,
}

/// 列表页上原始的订单条目（尚未解析）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    /// 订单信息块中每一行的文本
    #[serde(default)]
    pub info_lines: Vec<String>,
    /// 详情链接（可能是相对地址）
    #[serde(default)]
    pub detail_href: Option<String>,
}

/// 订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkState {
    Pending,
}

/// 派发前写入的订单状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkStatus {
    pub state: WorkState,
    /// 打开时间（毫秒时间戳）
    pub opened_at: i64,
}

impl WorkStatus {
    pub fn pending_at(opened_at: i64) -> Self {
        Self {
            state: WorkState::Pending,
            opened_at,
        }
    }

    pub fn pending_now() -> Self {
        Self::pending_at(Utc::now().timestamp_millis())
    }

    pub fn is_pending(&self) -> bool {
        self.state == WorkState::Pending
    }

    /// 是否已经超过给定的超时时间
    pub fn is_expired(&self, now_ms: i64, timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.opened_at) > i64::try_from(timeout_ms).unwrap_or(i64::MAX)
    }
}

/// 结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// worker 写回的单个订单结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkResult {
    pub status: ResultStatus,
    pub order_id: String,
    /// 页面上实际收取的税
    pub found: Money,
    /// 判定阈值：subtotal × GST
    pub subtotal_threshold: Money,
    /// 按 (subtotal + shipping - discounts) 计算的应缴 GST
    #[serde(default)]
    pub expected: Money,
    /// 实收税与应缴 GST 的差额
    pub monetary_difference: Money,
    pub is_overcharge_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkResult {
    /// 构建失败结果
    pub fn error(order_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            order_id: order_id.into(),
            found: Money::ZERO,
            subtotal_threshold: Money::ZERO,
            expected: Money::ZERO,
            monetary_difference: Money::ZERO,
            is_overcharge_error: false,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// 价格明细中的一行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRow {
    pub label: String,
    pub value: String,
    /// 主金额为空时使用的嵌套金额
    #[serde(default)]
    pub nested_value: Option<String>,
}

impl PriceRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            nested_value: None,
        }
    }

    pub fn with_nested(mut self, nested: impl Into<String>) -> Self {
        self.nested_value = Some(nested.into());
        self
    }
}

/// 整个运行的累计统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionResults {
    /// 列表页上看到的订单总数
    pub total_orders: usize,
    /// 已经有结论的订单数（成功 + 失败）
    pub processed: usize,
    /// 处理失败/超时的订单数
    pub errors: usize,
    /// 判定为多收税的订单数
    pub discrepancies: usize,
    /// 多收税订单的差额合计
    pub total_overcharge_value: Money,
}

impl SessionResults {
    /// 记录一个 worker 结果
    pub fn record_result(&mut self, result: &WorkResult) {
        self.processed += 1;
        match result.status {
            ResultStatus::Error => self.errors += 1,
            ResultStatus::Success => {
                if result.is_overcharge_error {
                    self.discrepancies += 1;
                    self.total_overcharge_value += result.monetary_difference;
                }
            }
        }
    }

    /// 记录一个没有结果的失败（超时、无法派发、无法解析）
    pub fn record_failure(&mut self) {
        self.record_failures(1);
    }

    pub fn record_failures(&mut self, count: usize) {
        self.processed += count;
        self.errors += count;
    }

    pub fn successes(&self) -> usize {
        self.processed.saturating_sub(self.errors)
    }
}

/// 最终报告
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub results: SessionResults,
    pub successes: usize,
    /// 结束时是否还有未处理的批次
    pub batches_outstanding: bool,
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.results;
        writeln!(f, "订单总数: {}", r.total_orders)?;
        writeln!(f, "已处理: {}", r.processed)?;
        writeln!(f, "检查成功: {}", self.successes)?;
        writeln!(f, "处理失败/超时: {}", r.errors)?;
        writeln!(f, "疑似多收 GST 的订单: {}", r.discrepancies)?;
        write!(f, "多收 GST 合计: {}", r.total_overcharge_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success(order_id: &str, overcharge: bool, diff: f64) -> WorkResult {
        WorkResult {
            status: ResultStatus::Success,
            order_id: order_id.to_string(),
            found: Money::new(11.0),
            subtotal_threshold: Money::new(10.0),
            expected: Money::new(10.0),
            monetary_difference: Money::new(diff),
            is_overcharge_error: overcharge,
            message: None,
        }
    }

    #[test]
    fn test_status_wire_format() {
        let status = WorkStatus::pending_at(1_700_000_000_000);
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value, json!({"state": "pending", "openedAt": 1_700_000_000_000_i64}));
    }

    #[test]
    fn test_result_wire_format() {
        let value = serde_json::to_value(WorkResult::error("42", "boom")).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["orderId"], "42");
        assert_eq!(value["isOverchargeError"], false);
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn test_status_expiry() {
        let status = WorkStatus::pending_at(1_000);
        assert!(!status.is_expired(1_000 + 120_000, 120_000));
        assert!(status.is_expired(1_000 + 120_001, 120_000));
        assert!(!status.is_expired(i64::MAX, u64::MAX));
    }

    #[test]
    fn test_record_result_counts() {
        let mut results = SessionResults::default();
        results.record_result(&success("1", true, 1.5));
        results.record_result(&success("2", false, -0.5));
        results.record_result(&WorkResult::error("3", "timeout"));
        results.record_failure();

        assert_eq!(results.processed, 4);
        assert_eq!(results.errors, 2);
        assert_eq!(results.discrepancies, 1);
        assert_eq!(results.total_overcharge_value, Money::new(1.5));
        assert_eq!(results.successes(), 2);
    }
}
