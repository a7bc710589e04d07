//! 价格提取服务 - 业务能力层
//!
//! 纯函数：解析金额文本、按标签查找价格行、汇总折扣。
//! 不依赖任何页面结构，只处理 `PriceRow`

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::{Money, PriceRow, CURRENCY_PREFIX};

/// 被视为折扣的标签关键字
const DISCOUNT_KEYWORDS: [&str; 3] = ["coins", "coupon", "discount"];

/// 解析金额文本
///
/// - 去掉货币符号等装饰
/// - 包含 "free" 视为 0
/// - 逗号与点都视为分隔符，最后一个是小数点，其余的视为千分位
/// - 结果四舍五入到分
pub fn try_parse_money(text: &str) -> Result<Money, ExtractionError> {
    let original = text.trim();
    if original.is_empty() || original.to_lowercase().contains("free") {
        return Ok(Money::ZERO);
    }

    let cleaned: String = original
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let normalized = match cleaned.rfind('.') {
        Some(last_dot) => {
            let (integer, fraction) = cleaned.split_at(last_dot);
            format!("{}{}", integer.replace('.', ""), fraction)
        }
        None => cleaned,
    };

    let (sign, body) = match normalized.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, normalized.as_str()),
    };
    let numeric: String = body
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    numeric
        .parse::<f64>()
        .map(|value| Money::from_cents_rounded(sign * value))
        .map_err(|_| ExtractionError::Parse {
            raw: original.to_string(),
        })
}

/// 解析金额文本，无法解析时记录警告并返回 0
pub fn parse_money(text: &str, context_label: &str) -> Money {
    match try_parse_money(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ 金额解析失败 [{}]: {}，按 0 处理", context_label, e);
            Money::ZERO
        }
    }
}

/// 一行的金额文本：主金额为空（或只有货币前缀）时使用嵌套金额
pub fn row_value_text(row: &PriceRow) -> &str {
    let primary = row.value.trim();
    if primary.is_empty() || primary == CURRENCY_PREFIX {
        if let Some(nested) = row.nested_value.as_deref() {
            return nested.trim();
        }
    }
    primary
}

/// 按标签查找价格（不区分大小写的子串匹配），返回第一处匹配
pub fn find_labeled_value(rows: &[PriceRow], label: &str) -> Option<Money> {
    let needle = label.trim().to_lowercase();
    match rows
        .iter()
        .find(|row| row.label.trim().to_lowercase().contains(&needle))
    {
        Some(row) => {
            let raw = row_value_text(row);
            let value = parse_money(raw, label);
            debug!("找到 \"{}\": {} (原文: \"{}\")", label, value, raw);
            Some(value)
        }
        None => {
            warn!("⚠️ 未找到标签 \"{}\"", label);
            None
        }
    }
}

/// 汇总所有折扣（取绝对值）
///
/// 金额带负号，或标签包含折扣关键字的行都算折扣。仅用于报告
pub fn sum_discounts(rows: &[PriceRow]) -> Money {
    let total = rows
        .iter()
        .filter(|row| is_discount_row(row))
        .map(|row| {
            let label = row.label.trim().to_lowercase();
            let value = parse_money(row_value_text(row), &format!("Discount ({})", label));
            debug!("折扣 \"{}\": {}", label, value);
            value.abs()
        })
        .sum();
    debug!("折扣合计: {}", total);
    total
}

fn is_discount_row(row: &PriceRow) -> bool {
    let label = row.label.to_lowercase();
    row_value_text(row).contains('-') || DISCOUNT_KEYWORDS.iter().any(|k| label.contains(k))
}
