//! 工作流会话 - 基础设施层
//!
//! 唯一的浏览器会话所有者：驱动句柄、主窗口/当前窗口、登录后的 Cookie。
//! 会话只属于导航状态机，不在并发任务间共享。

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::infrastructure::driver::{BrowserDriver, SessionCookie};
use crate::models::Locator;

/// 元素等待轮询间隔
pub const LOCATE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 元素就绪条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// 出现在 DOM 中即可
    Present,
    /// 可见且可操作
    Actionable,
}

pub struct WorkflowSession<D: BrowserDriver> {
    driver: D,
    primary_window: Option<String>,
    current_window: Option<String>,
    cookies: Vec<SessionCookie>,
    closed: bool,
}

impl<D: BrowserDriver> WorkflowSession<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            primary_window: None,
            current_window: None,
            cookies: Vec::new(),
            closed: false,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn primary_window(&self) -> Option<&str> {
        self.primary_window.as_deref()
    }

    pub fn current_window(&self) -> Option<&str> {
        self.current_window.as_deref()
    }

    /// 记录主窗口（第一次调用时）
    pub async fn remember_primary_window(&mut self) -> AppResult<()> {
        let handle = self.driver.current_window().await?;
        if self.primary_window.is_none() {
            debug!("主窗口: {}", handle);
            self.primary_window = Some(handle.clone());
        }
        self.current_window = Some(handle);
        Ok(())
    }

    pub async fn window_handles(&self) -> AppResult<Vec<String>> {
        self.driver.window_handles().await
    }

    /// 等待新窗口出现并切换过去
    ///
    /// `before` 是点击前的窗口列表；超时仍没有新窗口时返回 `None`，不算失败。
    pub async fn switch_to_new_window(
        &mut self,
        before: &[String],
        timeout: Duration,
    ) -> AppResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let handles = self.driver.window_handles().await?;
            if handles.len() > before.len() {
                if let Some(newest) = handles.iter().rev().find(|h| !before.contains(h)) {
                    let newest = newest.clone();
                    self.driver.switch_to_window(&newest).await?;
                    info!("🪟 检测到新窗口，已切换: {}", newest);
                    self.current_window = Some(newest.clone());
                    return Ok(Some(newest));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(LOCATE_POLL_INTERVAL).await;
        }
    }

    /// 切回主窗口
    pub async fn restore_primary_window(&mut self) -> AppResult<()> {
        let Some(primary) = self.primary_window.clone() else {
            return Ok(());
        };
        if self.current_window.as_deref() == Some(primary.as_str()) {
            return Ok(());
        }
        self.driver.switch_to_window(&primary).await?;
        debug!("已切回主窗口: {}", primary);
        self.current_window = Some(primary);
        Ok(())
    }

    /// 在超时内等待元素就绪，超时返回 `None`
    pub async fn try_locate(
        &self,
        locator: &Locator,
        timeout: Duration,
        readiness: Readiness,
    ) -> AppResult<Option<D::Element>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.driver.find(locator).await? {
                let ready = match readiness {
                    Readiness::Present => true,
                    Readiness::Actionable => self.driver.is_actionable(&element).await?,
                };
                if ready {
                    return Ok(Some(element));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(LOCATE_POLL_INTERVAL).await;
        }
    }

    /// 保存当前 Cookie 作为认证状态
    pub async fn capture_cookies(&mut self) -> AppResult<usize> {
        let cookies = self.driver.cookies().await?;
        debug!("已捕获 {} 个 Cookie", cookies.len());
        self.cookies = cookies;
        Ok(self.cookies.len())
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// 读取最新 Cookie，失败时回退到登录时捕获的那一份
    pub async fn live_cookies(&self) -> Vec<SessionCookie> {
        match self.driver.cookies().await {
            Ok(cookies) if !cookies.is_empty() => cookies,
            Ok(_) => self.cookies.clone(),
            Err(e) => {
                warn!("读取 Cookie 失败，使用登录时的 Cookie: {}", e);
                self.cookies.clone()
            }
        }
    }

    /// 关闭会话，只会真正执行一次
    pub async fn close(&mut self) -> AppResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!("🔒 正在关闭浏览器会话...");
        self.driver.close().await
    }
}

impl<D: BrowserDriver> Drop for WorkflowSession<D> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("浏览器会话未显式关闭");
        }
    }
}
