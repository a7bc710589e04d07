use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};
use url::Url;

use crate::error::{AppError, AppResult};

/// 连接到浏览器并获取订单列表页
///
/// 优先复用地址与 `target_url` 同一路径的已打开标签页，找不到时新建并导航
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("目标 URL: {}", target_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let marker = list_path_marker(target_url);
    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面，查找地址包含 '{}' 的页面", pages.len(), marker);

    for p in pages.iter() {
        if let Ok(Some(page_url)) = p.url().await {
            debug!("检查页面: {}", page_url);
            if page_url.contains(&marker) {
                info!("✓ 找到订单列表页: {}", page_url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到订单列表页，创建新页面并导航到: {}", target_url);
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        AppError::page_creation_failed("about:blank", e)
    })?;
    page.goto(target_url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", target_url, e);
        AppError::page_creation_failed(target_url, e)
    })?;
    info!("已导航到: {}", target_url);

    Ok((browser, page))
}

/// 用于识别列表页的地址片段（host + path），无法解析时使用原字符串
fn list_path_marker(target_url: &str) -> String {
    match Url::parse(target_url) {
        Ok(url) => format!("{}{}", url.host_str().unwrap_or_default(), url.path()),
        Err(_) => target_url.to_string(),
    }
}
