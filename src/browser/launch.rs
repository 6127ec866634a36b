use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::BrowserError;
use crate::infrastructure::CdpDriver;

/// 启动浏览器
///
/// 人工登录需要可见窗口，因此默认有界面；`headless` 只用于已保存登录态的环境。
pub async fn launch_browser(headless: bool) -> Result<CdpDriver> {
    info!("🚀 启动浏览器 (无头模式: {})...", headless);

    let mut builder = BrowserConfig::builder();
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head().window_size(1366, 900)
    };

    let config = builder
        .args(vec![
            "--start-maximized",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            BrowserError::LaunchFailed(e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;
    debug!("浏览器启动成功");

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;

    Ok(CdpDriver::new(browser, page, handler_task, true))
}
