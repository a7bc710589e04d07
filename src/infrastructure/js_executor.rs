//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力，
//! 并在此基础上实现 `PageDom` / `OrderListing`

use async_trait::async_trait;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::config::Selectors;
use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::dom::{OrderListing, PageDom};
use crate::models::{OrderEntry, PriceRow};

/// JS 执行器
///
/// 职责：
/// - 持有一个 Page 资源（一个标签页）
/// - 暴露 eval() 能力
/// - 不认识订单 / 批次
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

/// 把选择器安全地嵌入 JS 字符串
fn js_str(value: &str) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[async_trait]
impl PageDom for JsExecutor {
    async fn current_url(&self) -> AppResult<String> {
        self.page
            .url()
            .await?
            .ok_or(AppError::Browser(BrowserError::UrlUnavailable))
    }

    async fn element_exists(&self, selector: &str) -> AppResult<bool> {
        let js_code = format!("document.querySelector({}) !== null", js_str(selector)?);
        self.eval_as(js_code).await
    }

    async fn element_text(&self, selector: &str) -> AppResult<Option<String>> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                return el ? (el.textContent || '') : null;
            }})()
            "#,
            js_str(selector)?
        );
        self.eval_as(js_code).await
    }

    async fn click(&self, selector: &str) -> AppResult<bool> {
        let js_code = format!(
            r#"
            (async () => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.scrollIntoView({{ behavior: "auto", block: "center" }});
                await new Promise(r => setTimeout(r, 300));
                el.click();
                return true;
            }})()
            "#,
            js_str(selector)?
        );
        debug!("点击元素: {}", selector);
        self.eval_as(js_code).await
    }

    async fn query_rows(&self, selectors: &Selectors) -> AppResult<Option<Vec<PriceRow>>> {
        let js_code = format!(
            r#"
            (() => {{
                const container = document.querySelector({container});
                if (!container) return null;
                return Array.from(container.querySelectorAll({row})).map(row => {{
                    const label = row.querySelector({label});
                    const value = row.querySelector({value});
                    const nested = value ? value.querySelector({nested}) : null;
                    return {{
                        label: label ? (label.textContent || '').trim() : '',
                        value: value ? (value.innerText || value.textContent || '').trim() : '',
                        nestedValue: nested ? (nested.textContent || '').trim() : null
                    }};
                }});
            }})()
            "#,
            container = js_str(&selectors.price_container)?,
            row = js_str(&selectors.price_row)?,
            label = js_str(&selectors.price_label)?,
            value = js_str(&selectors.price_value)?,
            nested = js_str(&selectors.nested_price_value)?,
        );
        self.eval_as(js_code).await
    }

    async fn close(&self) -> AppResult<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderListing for JsExecutor {
    async fn base_url(&self) -> AppResult<Url> {
        let current = self.current_url().await?;
        Url::parse(&current).map_err(|e| AppError::Other(format!("列表页地址无效 {}: {}", current, e)))
    }

    async fn order_entries(&self, selectors: &Selectors) -> AppResult<Vec<OrderEntry>> {
        let js_code = format!(
            r#"
            (() => Array.from(document.querySelectorAll({item})).map(item => {{
                const parent = item.querySelector({id_parent});
                const lines = parent
                    ? Array.from(parent.querySelectorAll(':scope > div')).map(d => (d.textContent || '').trim())
                    : [];
                const link = item.querySelector({link});
                return {{
                    infoLines: lines,
                    detailHref: link ? link.getAttribute('href') : null
                }};
            }}))()
            "#,
            item = js_str(&selectors.order_item)?,
            id_parent = js_str(&selectors.order_id_parent)?,
            link = js_str(&selectors.order_detail_link)?,
        );
        self.eval_as(js_code).await
    }
}
