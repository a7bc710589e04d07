//! # GST Checker
//!
//! 分批检查 AliExpress 订单是否多收 GST 的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、存储文件），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，实现 `PageDom` / `OrderListing`
//! - `SharedStore` - 控制端与 worker 之间唯一的通信通道
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数和单一能力
//! - 金额解析、GST 判定、订单发现、有界等待、存储记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个订单"的完整处理流程
//! - `OrderInspector` - 展开 → 提取 → 判定 → 写回结果 → 关闭页面
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 运行状态机，分批派发
//! - `orchestrator/poller` - 轮询对账，超时处理
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use browser::connect_to_browser_and_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{JsExecutor, MemoryStore, SharedStore};
pub use models::{FinalReport, SessionResults, WorkItem, WorkResult};
pub use orchestrator::{Orchestrator, RunPhase, RunState};
pub use workflow::{OrderCtx, OrderInspector};
