//! 页面能力接口 - 基础设施层
//!
//! 核心逻辑只依赖这里的 trait，不直接接触浏览器

use async_trait::async_trait;
use url::Url;

use crate::config::Selectors;
use crate::error::AppResult;
use crate::models::{OrderEntry, PriceRow};

/// 订单详情页（一个 worker 所在的视图）
#[async_trait]
pub trait PageDom: Send + Sync {
    /// 当前页面地址
    async fn current_url(&self) -> AppResult<String>;

    /// 元素是否存在
    async fn element_exists(&self, selector: &str) -> AppResult<bool>;

    /// 元素的文本内容，不存在时返回 `None`
    async fn element_text(&self, selector: &str) -> AppResult<Option<String>>;

    /// 滚动到元素并点击，返回元素是否存在
    async fn click(&self, selector: &str) -> AppResult<bool>;

    /// 读取价格容器中的所有行，容器不存在时返回 `None`
    async fn query_rows(&self, selectors: &Selectors) -> AppResult<Option<Vec<PriceRow>>>;

    /// 关闭自己的视图
    async fn close(&self) -> AppResult<()>;
}

/// 订单列表页（控制端所在的视图）
#[async_trait]
pub trait OrderListing: Send + Sync {
    /// 列表页地址，用于把相对链接转为绝对地址
    async fn base_url(&self) -> AppResult<Url>;

    /// 列出页面上的所有订单条目
    async fn order_entries(&self, selectors: &Selectors) -> AppResult<Vec<OrderEntry>>;
}

/// 打开订单详情视图
#[async_trait]
pub trait ViewLauncher: Send + Sync {
    /// 打开一个视图；视图里的 worker 独立运行，只通过共享存储回报结果
    async fn open_view(&self, locator: &Url, background: bool) -> AppResult<()>;
}
