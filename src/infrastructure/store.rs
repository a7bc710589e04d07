//! 共享存储 - 基础设施层
//!
//! 控制端和各个 worker 之间唯一的通信通道

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::error::AppResult;

/// 跨上下文共享的键值存储
///
/// 不提供事务：不同 key 的并发写互不冲突，同一个 key 约定只有一个写者
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// 读取一个值，不存在时返回 `None`
    async fn get(&self, key: &str) -> AppResult<Option<JsonValue>>;

    /// 写入一个值
    async fn set(&self, key: &str, value: JsonValue) -> AppResult<()>;

    /// 删除一个值，不存在时什么也不做
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 列出所有 key
    async fn list_keys(&self) -> AppResult<Vec<String>>;
}

/// 进程内存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, JsonValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<JsonValue>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> AppResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> AppResult<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}
