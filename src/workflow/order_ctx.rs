//! 订单处理上下文
//!
//! 封装"我正在处理哪个订单"这一信息

use std::fmt::Display;

/// 订单处理上下文
#[derive(Debug, Clone)]
pub struct OrderCtx {
    /// 订单号
    pub order_id: String,

    /// 详情页地址（仅用于日志显示）
    pub locator: String,
}

impl OrderCtx {
    /// 创建新的订单上下文
    pub fn new(order_id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            locator: locator.into(),
        }
    }
}

impl Display for OrderCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[订单 {}]", self.order_id)
    }
}
