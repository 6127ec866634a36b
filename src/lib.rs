//! # SEFAZ NF-e Download
//!
//! 从 SEFAZ-GO 门户批量下载 NF-e XML 的浏览器自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器），只暴露能力
//! - `BrowserDriver` - 浏览器能力抽象，`CdpDriver` 为 chromiumoxide 实现
//! - `WorkflowSession` - 唯一的会话所有者（窗口、Cookie）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PauseController` - 操作员活动时暂停、随机延迟
//! - `ConfirmationGate` - 人工检查点（控制台或通道）
//! - `DownloadExtractor` - 携带会话 Cookie 直接下载 XML
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 门户导航状态机 `NavigationMachine`
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，管理会话生命周期
//! - `orchestrator/entity_processor` - 单个 IE 的查询循环
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{BatchSummary, Category, DateRange, DownloadResult, LocatorConfig};
pub use orchestrator::{App, BatchOrchestrator, BatchRequest};
pub use workflow::{NavState, NavigationMachine};
