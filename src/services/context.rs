//! 工作流上下文
//!
//! 构造一次，在编排器、状态机和下载器之间传递；替代全局的暂停控制器和确认回调。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, Credentials};
use crate::error::AppResult;
use crate::models::LocatorConfig;
use crate::services::confirmation::ConfirmationGate;
use crate::services::pause::PauseController;

pub struct WorkflowContext {
    pub locators: LocatorConfig,
    pub pause: Arc<PauseController>,
    pub confirm: Arc<dyn ConfirmationGate>,
    pub portal_url: String,
    /// 必需元素的等待上限
    pub step_timeout: Duration,
    /// 可选控件、弹窗、新窗口的探测上限
    pub probe_timeout: Duration,
    /// 随机延迟区间（秒）
    pub delay: (f64, f64),
    pub screenshot_dir: Option<PathBuf>,
    pub credentials: Option<Credentials>,
}

impl WorkflowContext {
    pub fn new(locators: LocatorConfig, confirm: Arc<dyn ConfirmationGate>) -> Self {
        Self::from_config(&Config::default(), locators, confirm)
    }

    pub fn from_config(
        config: &Config,
        locators: LocatorConfig,
        confirm: Arc<dyn ConfirmationGate>,
    ) -> Self {
        let pause = PauseController::with_poll_interval(
            Duration::from_secs(config.idle_threshold_secs),
            Duration::from_millis(config.pause_poll_ms.max(1)),
        );
        Self {
            locators,
            pause: Arc::new(pause),
            confirm,
            portal_url: config.portal_url.clone(),
            step_timeout: config.step_timeout(),
            probe_timeout: config.probe_timeout(),
            delay: config.delay_range(),
            screenshot_dir: config.screenshot_dir.clone(),
            credentials: config.credentials.clone(),
        }
    }

    /// 暂停检查后随机等待
    pub async fn pace(&self) {
        self.pause.human_delay(self.delay.0, self.delay.1).await;
    }

    /// 人工检查点：阻塞直到操作员确认
    pub async fn checkpoint(&self, message: &str) -> AppResult<()> {
        info!("⏳ 等待人工确认: {}", message);
        self.confirm.confirm(message).await?;
        info!("✓ 已确认，继续执行");
        Ok(())
    }
}
