//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和会话生命周期，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（日志、配置、浏览器、会话关闭）
//! - 遍历所有 IE，隔离单个 IE 的失败
//! - 输出全局统计信息
//!
//! ### `entity_processor` - 单个 IE 处理器
//! - 按 incoming、outgoing 顺序执行查询循环
//! - 把每次查询的结果写入汇总和运行日志
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<IE>)
//!     ↓
//! entity_processor (处理 IE × 票据类型)
//!     ↓
//! workflow::NavigationMachine (门户导航)
//!     ↓
//! services (能力层：pause / confirmation / extractor)
//!     ↓
//! infrastructure (基础设施：BrowserDriver、WorkflowSession)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，entity_processor 管单个 IE
//! 2. **资源隔离**：只有编排层创建浏览器，会话由状态机独占
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **严格串行**：同一会话上的查询从不并发

pub mod batch_processor;
pub mod entity_processor;

// 重新导出主要类型
pub use batch_processor::{App, BatchOrchestrator, BatchRequest};
pub use entity_processor::process_entity;
