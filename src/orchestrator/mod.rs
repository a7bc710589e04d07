//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量订单处理器
//! - 运行生命周期（开始、分批、结束）
//! - 派发 worker，持有全部计数
//! - 手动节奏：每批完成后等待下一次触发
//!
//! ### `poller` - 批次轮询器
//! - 对账待处理列表与存储中的结果
//! - 超时的订单按失败计数
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓ ViewLauncher
//! workflow::OrderInspector (在独立视图中处理单个订单)
//!     ↓ SharedStore
//! poller (读取结果，更新计数)
//! ```
//!
//! 编排层与 worker 之间没有共享内存，只通过共享存储交换记录

pub mod batch_processor;
pub mod poller;

pub use batch_processor::{Orchestrator, RunPhase, RunState};
pub use poller::{Poller, TickOutcome};
