use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppResult, ConfigError};

/// 页面选择器配置
///
/// 站点结构变化时只需要改这里
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// 列表页：单个订单
    pub order_item: String,
    /// 列表页：订单号所在信息块
    pub order_id_parent: String,
    /// 列表页：详情链接
    pub order_detail_link: String,
    /// 详情页：价格明细展开按钮
    pub expand_button: String,
    /// 详情页：价格容器
    pub price_container: String,
    /// 详情页：单行价格
    pub price_row: String,
    /// 详情页：行标签
    pub price_label: String,
    /// 详情页：行金额
    pub price_value: String,
    /// 详情页：金额为空时的嵌套金额节点
    pub nested_price_value: String,
    /// 展开后出现的文本
    pub expanded_marker_text: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            order_item: ".order-main .order-item".to_string(),
            order_id_parent: ".order-item-header-right-info".to_string(),
            order_detail_link: r#"a[href*="/p/order/detail.html"]"#.to_string(),
            expand_button: "span.comet-icon-arrowdown.switch-icon".to_string(),
            price_container: ".order-price".to_string(),
            price_row: ".order-price-item".to_string(),
            price_label: ".left-col".to_string(),
            price_value: ".right-col".to_string(),
            nested_price_value: r#"div[class*="es--wrap"]"#.to_string(),
            expanded_marker_text: "Tax".to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每批同时打开的订单数量
    pub batch_size: usize,
    /// 同一批内两次打开标签页之间的间隔
    pub dispatch_delay_ms: u64,
    /// 详情页等待元素的最长时间
    pub element_timeout_ms: u64,
    /// 等待循环的探测间隔
    pub wait_interval_ms: u64,
    /// 控制端轮询结果的间隔
    pub poll_interval_ms: u64,
    /// 单个订单的全局超时
    pub worker_timeout_ms: u64,
    /// 详情页开始处理前的等待
    pub worker_start_delay_ms: u64,
    /// 展开后等待渲染稳定
    pub render_settle_ms: u64,
    /// 写入结果后关闭标签页前的等待
    pub close_grace_ms: u64,
    /// 列表页加载后的等待
    pub list_settle_ms: u64,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 订单列表页 URL
    pub target_url: String,
    /// 共享存储文件
    pub store_path: String,
    /// 输出报告文件
    pub output_log_file: String,
    /// 页面选择器
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10,
            dispatch_delay_ms: 1000,
            element_timeout_ms: 15_000,
            wait_interval_ms: 500,
            poll_interval_ms: 3000,
            worker_timeout_ms: 120_000,
            worker_start_delay_ms: 1500,
            render_settle_ms: 500,
            close_grace_ms: 2000,
            list_settle_ms: 2500,
            browser_debug_port: 9222,
            target_url: "https://www.aliexpress.com/p/order/index.html".to_string(),
            store_path: "gst_store.json".to_string(),
            output_log_file: "gst_report.txt".to_string(),
            selectors: Selectors::default(),
        }
    }
}

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "GST_CHECKER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "gst_checker.toml";

impl Config {
    /// 加载配置：先读 TOML 文件（存在时），再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let base = if Path::new(&path).exists() {
            info!("📄 读取配置文件: {}", path);
            Self::from_toml_file(&path)?
        } else {
            debug!("配置文件 {} 不存在，使用默认配置", path);
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    /// 只从环境变量加载
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            }
            .into()
        })
    }

    fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(content)?;
        Ok(config.normalized())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            batch_size: env_or("BATCH_SIZE", self.batch_size),
            dispatch_delay_ms: env_or("DISPATCH_DELAY_MS", self.dispatch_delay_ms),
            element_timeout_ms: env_or("ELEMENT_TIMEOUT_MS", self.element_timeout_ms),
            wait_interval_ms: env_or("WAIT_INTERVAL_MS", self.wait_interval_ms),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", self.poll_interval_ms),
            worker_timeout_ms: env_or("WORKER_TIMEOUT_MS", self.worker_timeout_ms),
            worker_start_delay_ms: env_or("WORKER_START_DELAY_MS", self.worker_start_delay_ms),
            render_settle_ms: env_or("RENDER_SETTLE_MS", self.render_settle_ms),
            close_grace_ms: env_or("CLOSE_GRACE_MS", self.close_grace_ms),
            list_settle_ms: env_or("LIST_SETTLE_MS", self.list_settle_ms),
            browser_debug_port: env_or("BROWSER_DEBUG_PORT", self.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            store_path: std::env::var("STORE_PATH").unwrap_or(self.store_path),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            selectors: self.selectors,
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        if self.batch_size == 0 {
            self.batch_size = 1;
        }
        self
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms)
    }

    pub fn worker_start_delay(&self) -> Duration {
        Duration::from_millis(self.worker_start_delay_ms)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn list_settle(&self) -> Duration {
        Duration::from_millis(self.list_settle_ms)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
