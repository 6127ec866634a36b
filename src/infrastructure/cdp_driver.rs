//! Chrome DevTools 驱动 - 基础设施层
//!
//! 持有唯一的 Browser 资源和当前活动的 Page，只暴露驱动能力。

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Element, Page};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::driver::{BrowserDriver, SessionCookie};
use crate::models::{Locator, Query};

const CLEAR_VALUE_JS: &str = r#"function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

const ACTIONABLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    return !this.disabled && rect.width > 0 && rect.height > 0;
}"#;

/// CDP 驱动
pub struct CdpDriver {
    browser: Mutex<Browser>,
    active: RwLock<Page>,
    handler: JoinHandle<()>,
    /// 由本程序启动的浏览器在关闭时退出；连接的浏览器只断开
    launched: bool,
    closed: AtomicBool,
}

impl CdpDriver {
    pub fn new(browser: Browser, page: Page, handler: JoinHandle<()>, launched: bool) -> Self {
        Self {
            browser: Mutex::new(browser),
            active: RwLock::new(page),
            handler,
            launched,
            closed: AtomicBool::new(false),
        }
    }

    async fn page(&self) -> AppResult<Page> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::SessionClosed.into());
        }
        Ok(self.active.read().await.clone())
    }

    async fn pages(&self) -> AppResult<Vec<Page>> {
        let browser = self.browser.lock().await;
        Ok(browser.pages().await?)
    }

    /// 在元素上执行 JS 函数并返回 JSON 结果
    async fn call_on(&self, element: &Element, function: &str) -> AppResult<JsonValue> {
        let returns = element.call_js_fn(function, false).await?;
        Ok(returns.result.value.unwrap_or(JsonValue::Null))
    }
}

fn handle_of(page: &Page) -> String {
    page.target_id().inner().clone()
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    type Element = Element;

    async fn goto(&self, url: &str) -> AppResult<()> {
        let page = self.page().await?;
        page.goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    async fn reload(&self) -> AppResult<()> {
        let page = self.page().await?;
        page.reload().await?;
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        let page = self.page().await?;
        Ok(page.url().await?.unwrap_or_default())
    }

    async fn find(&self, locator: &Locator) -> AppResult<Option<Element>> {
        let page = self.page().await?;
        let found = match locator.query() {
            Query::Css(css) => page.find_element(css).await,
            Query::XPath(xpath) => page.find_xpath(xpath).await,
        };
        match found {
            Ok(element) => Ok(Some(element)),
            Err(e) => {
                debug!("未找到元素 {}: {}", locator, e);
                Ok(None)
            }
        }
    }

    async fn find_all(&self, locator: &Locator) -> AppResult<Vec<Element>> {
        let page = self.page().await?;
        let found = match locator.query() {
            Query::Css(css) => page.find_elements(css).await,
            Query::XPath(xpath) => page.find_xpaths(xpath).await,
        };
        Ok(found.unwrap_or_default())
    }

    async fn is_actionable(&self, element: &Element) -> AppResult<bool> {
        let value = self.call_on(element, ACTIONABLE_JS).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &Element) -> AppResult<()> {
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, element: &Element, text: &str) -> AppResult<()> {
        element.click().await?;
        self.call_on(element, CLEAR_VALUE_JS).await?;
        element.type_str(text).await?;
        // 门户的日期掩码在失焦时才生效
        element.press_key("Tab").await?;
        Ok(())
    }

    async fn attribute(&self, element: &Element, name: &str) -> AppResult<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn text(&self, element: &Element) -> AppResult<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn window_handles(&self) -> AppResult<Vec<String>> {
        Ok(self.pages().await?.iter().map(handle_of).collect())
    }

    async fn current_window(&self) -> AppResult<String> {
        Ok(handle_of(&self.page().await?))
    }

    async fn switch_to_window(&self, handle: &str) -> AppResult<()> {
        let target = self
            .pages()
            .await?
            .into_iter()
            .find(|p| handle_of(p) == handle)
            .ok_or_else(|| BrowserError::WindowNotFound(handle.to_string()))?;
        target.bring_to_front().await?;
        *self.active.write().await = target;
        debug!("已切换到窗口 {}", handle);
        Ok(())
    }

    async fn cookies(&self) -> AppResult<Vec<SessionCookie>> {
        let page = self.page().await?;
        let cookies = page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie::new(c.name, c.value))
            .collect())
    }

    async fn accept_dialog(&self) -> AppResult<bool> {
        let page = self.page().await?;
        // 没有打开的对话框时 CDP 返回错误
        Ok(page
            .execute(HandleJavaScriptDialogParams::new(true))
            .await
            .is_ok())
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        let page = self.page().await?;
        page.save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.launched {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("等待浏览器进程退出失败: {}", e);
            }
        }
        self.handler.abort();
        debug!("浏览器会话已关闭");
        Ok(())
    }
}
