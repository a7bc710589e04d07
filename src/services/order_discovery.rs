//! 订单发现服务 - 业务能力层
//!
//! 把列表页的原始条目映射为 `WorkItem`，无法解析的条目被丢弃并记录

use std::collections::HashSet;

use regex::Regex;
use tracing::{error, info};
use url::Url;

use crate::config::Selectors;
use crate::error::{AppError, AppResult, DiscoveryError};
use crate::infrastructure::OrderListing;
use crate::models::{OrderEntry, WorkItem};

/// 详情页地址中的订单号参数
pub const ORDER_ID_PARAM: &str = "orderId";

/// 发现结果
#[derive(Debug, Default)]
pub struct Discovery {
    /// 可以派发的订单
    pub items: Vec<WorkItem>,
    /// 被丢弃的条目
    pub dropped: Vec<DiscoveryError>,
    /// 列表页上看到的条目总数
    pub entries_seen: usize,
}

/// 从列表页发现所有订单
pub async fn discover(listing: &dyn OrderListing, selectors: &Selectors) -> AppResult<Discovery> {
    info!("🔍 正在查找订单: \"{}\"", selectors.order_item);
    let base = listing.base_url().await?;
    let entries = listing.order_entries(selectors).await?;
    map_entries(&entries, &base)
}

/// 把原始条目映射为订单
pub fn map_entries(entries: &[OrderEntry], base: &Url) -> AppResult<Discovery> {
    let order_id_re = Regex::new(r"Order ID:\s*(\d+)")
        .map_err(|e| AppError::Other(format!("订单号正则无效: {}", e)))?;

    let mut discovery = Discovery {
        entries_seen: entries.len(),
        ..Default::default()
    };
    let mut seen_ids = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let position = index + 1;
        let locator = entry
            .detail_href
            .as_deref()
            .filter(|href| !href.trim().is_empty())
            .and_then(|href| base.join(href.trim()).ok());

        let order_id = order_id_from_lines(&entry.info_lines, &order_id_re)
            .or_else(|| locator.as_ref().and_then(order_id_from_locator));

        let (order_id, locator) = match (order_id, locator) {
            (Some(order_id), Some(locator)) => (order_id, locator),
            (order_id, locator) => {
                let err = DiscoveryError::EntryUnresolved {
                    index: position,
                    order_id,
                    locator: locator.map(String::from),
                };
                error!("❌ {}，跳过", err);
                discovery.dropped.push(err);
                continue;
            }
        };

        if !seen_ids.insert(order_id.clone()) {
            let err = DiscoveryError::DuplicateOrder {
                index: position,
                order_id,
            };
            error!("❌ {}，跳过", err);
            discovery.dropped.push(err);
            continue;
        }

        discovery.items.push(WorkItem {
            id: order_id,
            locator,
        });
    }

    info!(
        "✓ 成功解析 {}/{} 个订单",
        discovery.items.len(),
        discovery.entries_seen
    );
    Ok(discovery)
}

fn order_id_from_lines(lines: &[String], re: &Regex) -> Option<String> {
    lines
        .iter()
        .filter(|line| line.contains("Order ID:"))
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 从详情页地址中取订单号
pub fn order_id_from_locator(locator: &Url) -> Option<String> {
    locator
        .query_pairs()
        .find(|(key, _)| key == ORDER_ID_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
