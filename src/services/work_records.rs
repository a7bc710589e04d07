//! 共享存储中的记录 - 业务能力层
//!
//! key 约定：
//! - `status:<订单号>`：派发前写入的 `WorkStatus`
//! - `result:<订单号>`：worker 写回的 `WorkResult`
//! - `pending:<批次号>`：当前批次待处理订单号列表（JSON 字符串）

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, CoordinationError};
use crate::infrastructure::SharedStore;
use crate::models::{WorkResult, WorkStatus};

pub const STATUS_PREFIX: &str = "status:";
pub const RESULT_PREFIX: &str = "result:";
pub const PENDING_PREFIX: &str = "pending:";

pub fn status_key(order_id: &str) -> String {
    format!("{}{}", STATUS_PREFIX, order_id)
}

pub fn result_key(order_id: &str) -> String {
    format!("{}{}", RESULT_PREFIX, order_id)
}

pub fn pending_key(batch_index: usize) -> String {
    format!("{}{}", PENDING_PREFIX, batch_index)
}

/// 写入订单状态
pub async fn write_status(store: &dyn SharedStore, order_id: &str, status: &WorkStatus) -> AppResult<()> {
    let key = status_key(order_id);
    let value = serde_json::to_value(status).map_err(|e| AppError::store_serialization(&key, e))?;
    store.set(&key, value).await
}

/// 读取订单状态；无法解析的值视为不存在
pub async fn read_status(store: &dyn SharedStore, order_id: &str) -> AppResult<Option<WorkStatus>> {
    let key = status_key(order_id);
    Ok(match store.get(&key).await? {
        Some(value) => match serde_json::from_value(value) {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("⚠️ {} 无法解析，视为不存在: {}", key, e);
                None
            }
        },
        None => None,
    })
}

/// 写入订单结果
pub async fn write_result(store: &dyn SharedStore, result: &WorkResult) -> AppResult<()> {
    let key = result_key(&result.order_id);
    let value = serde_json::to_value(result).map_err(|e| AppError::store_serialization(&key, e))?;
    store.set(&key, value).await
}

/// 读取订单结果；值存在但无法解析时转为失败结果
pub async fn read_result(store: &dyn SharedStore, order_id: &str) -> AppResult<Option<WorkResult>> {
    let key = result_key(order_id);
    Ok(match store.get(&key).await? {
        Some(JsonValue::Null) | None => None,
        Some(value) => match serde_json::from_value(value) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("⚠️ {} 无法解析，按失败处理: {}", key, e);
                Some(WorkResult::error(order_id, format!("结果无法解析: {}", e)))
            }
        },
    })
}

/// 消费一个订单的记录（结果和状态一起删除）
pub async fn consume(store: &dyn SharedStore, order_id: &str) -> AppResult<()> {
    store.delete(&result_key(order_id)).await?;
    store.delete(&status_key(order_id)).await
}

/// 保存批次的待处理列表
pub async fn save_pending(store: &dyn SharedStore, batch_index: usize, ids: &[String]) -> AppResult<()> {
    let key = pending_key(batch_index);
    let encoded = serde_json::to_string(ids).map_err(|e| AppError::store_serialization(&key, e))?;
    store.set(&key, JsonValue::String(encoded)).await
}

/// 读取批次的待处理列表
///
/// 不存在时返回 `None`；内容损坏时返回 `CoordinationError::CorruptedPending`
pub async fn load_pending(store: &dyn SharedStore, batch_index: usize) -> AppResult<Option<Vec<String>>> {
    let key = pending_key(batch_index);
    let encoded = match store.get(&key).await? {
        None => return Ok(None),
        Some(JsonValue::String(encoded)) => encoded,
        Some(other) => {
            return Err(CoordinationError::CorruptedPending {
                key,
                reason: format!("不是字符串: {}", other),
            }
            .into())
        }
    };

    serde_json::from_str::<Vec<String>>(&encoded)
        .map(Some)
        .map_err(|e| {
            CoordinationError::CorruptedPending {
                key,
                reason: e.to_string(),
            }
            .into()
        })
}

/// 删除上一次运行残留的所有记录，返回删除的数量
pub async fn clear_run_keys(store: &dyn SharedStore) -> AppResult<usize> {
    let keys = store.list_keys().await?;
    let mut removed = 0;
    for key in keys.iter().filter(|k| {
        k.starts_with(STATUS_PREFIX) || k.starts_with(RESULT_PREFIX) || k.starts_with(PENDING_PREFIX)
    }) {
        store.delete(key).await?;
        removed += 1;
    }
    debug!("清理了 {} 个残留记录", removed);
    Ok(removed)
}
