//! 后台标签页启动器
//!
//! 为每个订单打开一个后台标签页，并在其中启动独立的 worker 任务

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::Browser;
use tracing::{debug, error};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{JsExecutor, ViewLauncher};
use crate::workflow::{InspectionOutcome, OrderInspector};

/// 通过 CDP 打开标签页的 `ViewLauncher`
pub struct TabLauncher {
    browser: Arc<Browser>,
    inspector: Arc<OrderInspector>,
}

impl TabLauncher {
    pub fn new(browser: Arc<Browser>, inspector: Arc<OrderInspector>) -> Self {
        Self { browser, inspector }
    }
}

#[async_trait]
impl ViewLauncher for TabLauncher {
    async fn open_view(&self, locator: &Url, background: bool) -> AppResult<()> {
        let params = CreateTargetParams::builder()
            .url(locator.as_str())
            .background(background)
            .build()
            .map_err(|e| AppError::Other(format!("创建标签页参数无效: {}", e)))?;

        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| AppError::page_creation_failed(locator.as_str(), e))?;
        debug!("已打开标签页: {}", locator);

        // worker 与控制端只通过共享存储通信，任务句柄不需要保留
        let inspector = self.inspector.clone();
        tokio::spawn(async move {
            let view = JsExecutor::new(page);
            match inspector.run(&view).await {
                Ok(InspectionOutcome::Reported(result)) => {
                    debug!("[订单 {}] worker 结束", result.order_id)
                }
                Ok(other) => debug!("worker 未回报结果: {:?}", other),
                Err(e) => error!("❌ worker 异常结束: {}", e),
            }
        });

        Ok(())
    }
}
