use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::infrastructure::CdpDriver;

/// 连接到已运行的浏览器（需以 --remote-debugging-port 启动）
///
/// 优先复用 URL 包含 `target_url_hint` 的页面，否则新建页面。
pub async fn connect_to_browser(port: u16, target_url_hint: Option<&str>) -> Result<CdpDriver> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("浏览器连接成功");

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = pick_page(&browser, target_url_hint).await?;
    Ok(CdpDriver::new(browser, page, handler_task, false))
}

async fn pick_page(browser: &Browser, target_url_hint: Option<&str>) -> Result<Page> {
    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    if let Some(hint) = target_url_hint {
        for p in pages.iter() {
            if let Ok(Some(url)) = p.url().await {
                if url.contains(hint) {
                    info!("✓ 复用已打开的页面: {}", url);
                    return Ok(p.clone());
                }
            }
        }
    }

    if let Some(first) = pages.into_iter().next() {
        return Ok(first);
    }

    debug!("创建空白页面");
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建空白页面失败: {}", e);
        e
    })?;
    Ok(page)
}
