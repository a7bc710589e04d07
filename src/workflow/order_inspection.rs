//! 订单检查流程 - 流程层
//!
//! 运行在单个订单详情页里的 worker：
//! 1. 从自己的页面地址得到订单号
//! 2. 确认共享存储里该订单处于 pending（不是本次运行打开的页面直接退出）
//! 3. 等待并点击价格明细展开按钮
//! 4. 等待展开内容出现
//! 5. 提取价格并判定
//! 6. 写回唯一一个结果（成功或失败）
//! 7. 稍等片刻后关闭自己的页面

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{Config, Selectors};
use crate::error::{AppResult, ExtractionError};
use crate::infrastructure::{PageDom, SharedStore};
use crate::models::WorkResult;
use crate::services::order_discovery::order_id_from_locator;
use crate::services::page_waits::{find_element, wait_for_text};
use crate::services::work_records::{read_status, write_result};
use crate::services::TaxAssessment;
use crate::workflow::order_ctx::OrderCtx;

/// worker 的结局
#[derive(Debug, Clone, PartialEq)]
pub enum InspectionOutcome {
    /// 已写回结果
    Reported(WorkResult),
    /// 该订单不在 pending 状态，未处理
    NotDispatched { order_id: String },
    /// 页面地址中没有订单号，无法回报
    Unidentified { locator: String },
}

/// 订单检查流程
///
/// - 只通过共享存储与控制端通信
/// - 任何提取失败都转为失败结果，不会漏报
pub struct OrderInspector {
    store: Arc<dyn SharedStore>,
    selectors: Selectors,
    element_timeout: Duration,
    wait_interval: Duration,
    start_delay: Duration,
    render_settle: Duration,
    close_grace: Duration,
}

impl OrderInspector {
    /// 创建新的检查流程
    pub fn new(store: Arc<dyn SharedStore>, config: &Config) -> Self {
        Self {
            store,
            selectors: config.selectors.clone(),
            element_timeout: config.element_timeout(),
            wait_interval: config.wait_interval(),
            start_delay: config.worker_start_delay(),
            render_settle: config.render_settle(),
            close_grace: config.close_grace(),
        }
    }

    /// 在给定页面上执行一次完整流程，结束后关闭页面
    pub async fn run(&self, view: &dyn PageDom) -> AppResult<InspectionOutcome> {
        let outcome = self.run_in_view(view).await;

        sleep(self.close_grace).await;
        if let Err(e) = view.close().await {
            warn!("⚠️ 关闭页面失败: {}", e);
        }

        outcome
    }

    async fn run_in_view(&self, view: &dyn PageDom) -> AppResult<InspectionOutcome> {
        let locator = view.current_url().await?;
        let order_id = match Url::parse(&locator).ok().as_ref().and_then(order_id_from_locator) {
            Some(order_id) => order_id,
            None => {
                error!(
                    "❌ {}，无法回报结果",
                    ExtractionError::OrderIdUnresolved {
                        locator: locator.clone()
                    }
                );
                return Ok(InspectionOutcome::Unidentified { locator });
            }
        };
        let ctx = OrderCtx::new(order_id, locator);

        let status = read_status(self.store.as_ref(), &ctx.order_id)
            .await
            .map_err(|e| {
                error!("{} ❌ 读取订单状态失败: {}", ctx, e);
                e
            })?;
        match status {
            Some(status) if status.is_pending() => {
                info!("{} 页面由本次运行打开，开始处理", ctx);
            }
            _ => {
                warn!("{} ⚠️ 不在待处理状态，不自动处理", ctx);
                return Ok(InspectionOutcome::NotDispatched {
                    order_id: ctx.order_id,
                });
            }
        }

        sleep(self.start_delay).await;

        let result = match self.inspect(view, &ctx).await {
            Ok(assessment) => {
                info!(
                    "{} ✓ 处理成功: 税={}, 阈值={}, 多收={}",
                    ctx,
                    assessment.tax,
                    assessment.subtotal_threshold,
                    assessment.is_overcharge_error
                );
                assessment.into_result(&ctx.order_id)
            }
            Err(e) => {
                error!("{} ❌ 处理失败: {}", ctx, e);
                WorkResult::error(&ctx.order_id, e.to_string())
            }
        };

        info!("{} 写回结果...", ctx);
        write_result(self.store.as_ref(), &result).await?;
        Ok(InspectionOutcome::Reported(result))
    }

    /// 展开价格明细并判定
    async fn inspect(&self, view: &dyn PageDom, ctx: &OrderCtx) -> AppResult<TaxAssessment> {
        let selectors = &self.selectors;

        find_element(view, &selectors.expand_button, self.wait_interval, self.element_timeout).await?;
        if !view.click(&selectors.expand_button).await? {
            return Err(ExtractionError::ElementTimeout {
                selector: selectors.expand_button.clone(),
                waited_ms: 0,
            }
            .into());
        }
        info!("{} 已点击展开按钮", ctx);

        wait_for_text(
            view,
            &selectors.price_container,
            &selectors.expanded_marker_text,
            self.wait_interval,
            self.element_timeout,
        )
        .await?;
        sleep(self.render_settle).await;

        let rows = view
            .query_rows(selectors)
            .await?
            .ok_or_else(|| ExtractionError::PriceContainerMissing {
                selector: selectors.price_container.clone(),
            })?;

        Ok(TaxAssessment::from_rows(&rows)?)
    }
}
