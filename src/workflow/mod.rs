//! 流程层（Workflow Layer）
//!
//! 门户导航状态机：登录、受限区域、下载服务和每个 IE 的查询循环。
//! 只依赖 services 和 infrastructure，不持有批量状态。

pub mod navigation;

pub use navigation::{NavState, NavigationMachine, ResultsOutcome};
