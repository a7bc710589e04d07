//! 持久化共享存储
//!
//! 整个存储保存为一个 JSON 对象文件，每次写入后落盘，进程重启后依然可读

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::SharedStore;

/// JSON 文件存储
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, JsonValue>>,
}

impl JsonFileStore {
    /// 打开（或新建）存储文件
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if fs::try_exists(&path)
            .await
            .map_err(|e| AppError::store_io(path.display().to_string(), e))?
        {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| AppError::store_io(path.display().to_string(), e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&content) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("⚠️ 存储文件 {} 无法解析，将重新开始: {}", path.display(), e);
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("打开存储文件 {}，已有 {} 个 key", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// 先写临时文件再改名，避免写到一半的文件
    async fn persist(&self, entries: &BTreeMap<String, JsonValue>) -> AppResult<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::store_serialization(self.path.display().to_string(), e))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| AppError::store_io(tmp.display().to_string(), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::store_io(self.path.display().to_string(), e))?;
        Ok(())
    }
}

#[async_trait]
impl SharedStore for JsonFileStore {
    async fn get(&self, key: &str) -> AppResult<Option<JsonValue>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn list_keys(&self) -> AppResult<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store
                .set("status:100", json!({"state": "pending", "openedAt": 5}))
                .await
                .unwrap();
            store.set("pending:0", json!("[\"100\"]")).await.unwrap();
            store.set("result:7", json!({"status": "error"})).await.unwrap();
            store.delete("result:7").await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.list_keys().await.unwrap(),
            vec!["pending:0".to_string(), "status:100".to_string()]
        );
        assert_eq!(
            reopened.get("status:100").await.unwrap(),
            Some(json!({"state": "pending", "openedAt": 5}))
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }
}
