//! 页面等待服务 - 业务能力层
//!
//! 在 `PageDom` 之上提供有界的元素等待和文本等待

use std::time::Duration;

use tracing::{debug, error};

use crate::error::ExtractionError;
use crate::infrastructure::PageDom;
use crate::utils::await_condition;

/// 等待元素出现
pub async fn find_element(
    dom: &dyn PageDom,
    selector: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<(), ExtractionError> {
    debug!("等待元素: \"{}\" (最多 {}ms)", selector, timeout.as_millis());
    await_condition(
        || async move {
            match dom.element_exists(selector).await {
                Ok(true) => Some(()),
                Ok(false) => None,
                Err(e) => {
                    debug!("探测元素 \"{}\" 失败: {}", selector, e);
                    None
                }
            }
        },
        interval,
        timeout,
    )
    .await
    .map_err(|t| {
        error!("等待元素超时: \"{}\"", selector);
        ExtractionError::ElementTimeout {
            selector: selector.to_string(),
            waited_ms: t.waited_ms(),
        }
    })
}

/// 等待元素中出现指定文本（不区分大小写）
pub async fn wait_for_text(
    dom: &dyn PageDom,
    selector: &str,
    text: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<(), ExtractionError> {
    debug!(
        "等待文本 \"{}\" 出现在 \"{}\" (最多 {}ms)",
        text,
        selector,
        timeout.as_millis()
    );
    let needle = text.to_lowercase();
    let needle = needle.as_str();
    await_condition(
        || async move {
            match dom.element_text(selector).await {
                Ok(Some(content)) if content.to_lowercase().contains(needle) => Some(()),
                Ok(_) => None,
                Err(e) => {
                    debug!("读取 \"{}\" 文本失败: {}", selector, e);
                    None
                }
            }
        },
        interval,
        timeout,
    )
    .await
    .map_err(|t| {
        error!("等待文本 \"{}\" 超时", text);
        ExtractionError::ContentTimeout {
            selector: selector.to_string(),
            text: text.to_string(),
            waited_ms: t.waited_ms(),
        }
    })
}
