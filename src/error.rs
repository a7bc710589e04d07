use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 共享存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 订单发现错误
    #[error("发现错误: {0}")]
    Discovery(#[from] DiscoveryError),
    /// 单个订单的提取错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 控制端与 worker 之间的协调错误
    #[error("协调错误: {0}")]
    Coordination(#[from] CoordinationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面（标签页）失败
    #[error("打开页面失败 ({url}): {source}")]
    PageCreationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面没有可用的 URL
    #[error("页面 URL 不可用")]
    UrlUnavailable,
}

/// 共享存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读写持久化文件失败
    #[error("存储文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化/反序列化失败
    #[error("存储值序列化失败 ({key}): {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 订单发现错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 列表页没有任何可处理的订单
    #[error("没有找到可处理的订单")]
    NoWorkFound,
    /// 无法确定订单号或详情链接
    #[error("第 {index} 个订单无法解析 (订单号: {order_id:?}, 链接: {locator:?})")]
    EntryUnresolved {
        index: usize,
        order_id: Option<String>,
        locator: Option<String>,
    },
    /// 订单号重复出现
    #[error("订单 {order_id} 重复出现 (第 {index} 个)")]
    DuplicateOrder { index: usize, order_id: String },
}

/// 单个订单的提取错误（worker 侧）
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 等待元素超时
    #[error("等待元素超时: {selector} ({waited_ms}ms)")]
    ElementTimeout { selector: String, waited_ms: u64 },
    /// 等待展开内容超时
    #[error("等待文本 '{text}' 出现在 {selector} 超时 ({waited_ms}ms)")]
    ContentTimeout {
        selector: String,
        text: String,
        waited_ms: u64,
    },
    /// 金额文本无法解析
    #[error("无法解析金额: '{raw}'")]
    Parse { raw: String },
    /// 必需字段缺失
    #[error("关键金额缺失: Subtotal ({subtotal}) / Tax ({tax})")]
    MissingField { subtotal: String, tax: String },
    /// 无法从页面地址得到订单号
    #[error("无法从页面地址获取订单号: {locator}")]
    OrderIdUnresolved { locator: String },
    /// 展开后找不到价格容器
    #[error("展开后找不到价格容器 ({selector})")]
    PriceContainerMissing { selector: String },
}

/// 协调错误（控制端）
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// 待处理列表损坏
    #[error("待处理列表 {key} 已损坏: {reason}")]
    CorruptedPending { key: String, reason: String },
    /// worker 在超时时间内没有返回结果
    #[error("订单 {order_id} 超时 (>{waited_ms}ms)，视为失败")]
    LostWorker { order_id: String, waited_ms: u64 },
    /// 已有运行中的检查
    #[error("检查已在进行中")]
    AlreadyRunning,
    /// 当前状态不能开始下一批
    #[error("当前状态 {state} 不能开始下一批")]
    NotReadyForBatch { state: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::Serialization {
            key: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建打开页面失败错误
    pub fn page_creation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::PageCreationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建存储文件读写错误
    pub fn store_io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Store(StoreError::Io {
            path: path.into(),
            source,
        })
    }

    /// 创建存储值序列化错误
    pub fn store_serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::Store(StoreError::Serialization {
            key: key.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
