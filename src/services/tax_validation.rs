//! GST 判定服务 - 业务能力层
//!
//! 判定规则固定：实收税 > subtotal × GST_RATE 即视为多收。
//! `monetary_difference` 按 (subtotal + shipping - discounts) 计算，
//! 只用于报告，与判定条件的计税基础不同，两者保持现状不做统一

use tracing::debug;

use crate::error::ExtractionError;
use crate::models::{Money, PriceRow, ResultStatus, WorkResult};
use crate::services::price_extraction::{find_labeled_value, sum_discounts};

/// GST 税率
pub const GST_RATE: f64 = 0.10;

/// 单个订单的价格明细与判定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxAssessment {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discounts: Money,
    /// subtotal + shipping - discounts
    pub taxable_base: Money,
    /// taxable_base × GST_RATE
    pub expected_gst: Money,
    /// subtotal × GST_RATE
    pub subtotal_threshold: Money,
    /// tax - expected_gst
    pub monetary_difference: Money,
    pub is_overcharge_error: bool,
}

impl TaxAssessment {
    /// 按固定规则计算
    pub fn evaluate(subtotal: Money, tax: Money, shipping: Money, discounts: Money) -> Self {
        let taxable_base = subtotal + shipping - discounts;
        let expected_gst = taxable_base * GST_RATE;
        let subtotal_threshold = subtotal * GST_RATE;

        Self {
            subtotal,
            tax,
            shipping,
            discounts,
            taxable_base,
            expected_gst,
            subtotal_threshold,
            monetary_difference: tax - expected_gst,
            is_overcharge_error: tax > subtotal_threshold,
        }
    }

    /// 从价格行计算；Subtotal 和 Tax 必须存在
    pub fn from_rows(rows: &[PriceRow]) -> Result<Self, ExtractionError> {
        let subtotal = find_labeled_value(rows, "Subtotal");
        let tax = find_labeled_value(rows, "Tax");

        let (subtotal, tax) = match (subtotal, tax) {
            (Some(subtotal), Some(tax)) => (subtotal, tax),
            (subtotal, tax) => {
                return Err(ExtractionError::MissingField {
                    subtotal: describe(subtotal),
                    tax: describe(tax),
                })
            }
        };

        let discounts = sum_discounts(rows);
        let shipping = find_labeled_value(rows, "Shipping").unwrap_or(Money::ZERO);

        let assessment = Self::evaluate(subtotal, tax, shipping, discounts);
        debug!(
            "计算: 基数={}, 应缴GST={}, 实收税={}, 差额={}, 阈值={}, 多收={}",
            assessment.taxable_base,
            assessment.expected_gst,
            assessment.tax,
            assessment.monetary_difference,
            assessment.subtotal_threshold,
            assessment.is_overcharge_error
        );
        Ok(assessment)
    }

    /// 转为写入存储的成功结果
    pub fn into_result(self, order_id: impl Into<String>) -> WorkResult {
        WorkResult {
            status: ResultStatus::Success,
            order_id: order_id.into(),
            found: self.tax,
            subtotal_threshold: self.subtotal_threshold,
            expected: self.expected_gst,
            monetary_difference: self.monetary_difference,
            is_overcharge_error: self.is_overcharge_error,
            message: None,
        }
    }
}

fn describe(value: Option<Money>) -> String {
    value.map_or_else(|| "未找到".to_string(), |v| v.to_string())
}
