//! 导航状态机 - 流程层
//!
//! 驱动唯一的浏览器会话完成：打开门户 → 人工登录 → 受限区域（可能新窗口）
//! → 二次验证 → 下载服务 → 每个 IE/票据类型的查询循环 → 结束。
//!
//! 状态转换前都会经过暂停检查；必需元素超时记录现场（URL、截图）后返回
//! 可恢复的 [`LocatorError::Timeout`]，由调用方决定放弃当前 IE 还是整批。

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{AppResult, LocatorError};
use crate::infrastructure::session::LOCATE_POLL_INTERVAL;
use crate::infrastructure::{BrowserDriver, Readiness, WorkflowSession};
use crate::models::{roles, DownloadResult, EntityQuery, Role};
use crate::services::{DownloadExtractor, ResourceFetcher, WorkflowContext};

pub const LOGIN_PROMPT: &str = "请在浏览器中完成登录，然后继续";
pub const SECONDARY_AUTH_PROMPT: &str = "请完成受限区域所需的身份验证，然后继续";
pub const ADDITIONAL_AUTH_PROMPT: &str = "如需再次验证请在浏览器中完成，然后继续";

/// 导航状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Init,
    PortalLoaded,
    Authenticated,
    RestrictedAreaRequested,
    DownloadServiceOpen,
    SearchSubmitted,
    ResultsReady,
    FilesExtracted,
    NextQueryReset,
    Done,
}

/// 查询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsOutcome {
    /// 结果表已出现
    Ready,
    /// 门户提示没有结果
    Empty,
}

/// 导航状态机，独占工作流会话
pub struct NavigationMachine<D: BrowserDriver> {
    session: WorkflowSession<D>,
    ctx: Arc<WorkflowContext>,
    state: NavState,
    history: Vec<NavState>,
    query_page_url: Option<String>,
}

impl<D: BrowserDriver> NavigationMachine<D> {
    pub fn new(session: WorkflowSession<D>, ctx: Arc<WorkflowContext>) -> Self {
        Self {
            session,
            ctx,
            state: NavState::Init,
            history: vec![NavState::Init],
            query_page_url: None,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// 经过的所有状态
    pub fn history(&self) -> &[NavState] {
        &self.history
    }

    pub fn context(&self) -> &Arc<WorkflowContext> {
        &self.ctx
    }

    pub fn session(&self) -> &WorkflowSession<D> {
        &self.session
    }

    pub fn query_page_url(&self) -> Option<&str> {
        self.query_page_url.as_deref()
    }

    fn transition(&mut self, next: NavState) {
        debug!("状态: {:?} → {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    // ========== 定位原语 ==========

    /// 探测可选控件，不存在时返回 `None`
    pub async fn try_locate(
        &self,
        role: Role,
        timeout: std::time::Duration,
    ) -> AppResult<Option<D::Element>> {
        let locator = self.ctx.locators.locator(role)?;
        self.session
            .try_locate(&locator, timeout, Readiness::Actionable)
            .await
    }

    /// 等待必需元素；超时记录现场并返回可恢复错误
    async fn wait_for(&self, role: Role, readiness: Readiness) -> AppResult<D::Element> {
        self.ctx.pause.check().await;
        let locator = self.ctx.locators.locator(role)?;
        match self
            .session
            .try_locate(&locator, self.ctx.step_timeout, readiness)
            .await?
        {
            Some(element) => Ok(element),
            None => Err(self.report_timeout(role).await.into()),
        }
    }

    async fn click(&self, role: Role) -> AppResult<()> {
        let element = self.wait_for(role, Readiness::Actionable).await?;
        self.session.driver().click(&element).await?;
        debug!("点击 {}", role);
        Ok(())
    }

    async fn fill(&self, role: Role, text: &str) -> AppResult<()> {
        let element = self.wait_for(role, Readiness::Actionable).await?;
        self.session.driver().fill(&element, text).await
    }

    /// 记录当前位置，必要时截图
    async fn report_timeout(&self, role: Role) -> LocatorError {
        let url = self
            .session
            .driver()
            .current_url()
            .await
            .unwrap_or_else(|_| "<unknown>".to_string());
        warn!(
            "⚠️ 等待 {} 超时 ({:?})，当前页面: {}",
            role, self.ctx.step_timeout, url
        );

        if let Some(dir) = &self.ctx.screenshot_dir {
            let name = format!(
                "{}_{}_{}.png",
                chrono::Local::now().format("%Y%m%d_%H%M%S"),
                role.step,
                role.name
            );
            let path = dir.join(name);
            let saved = match tokio::fs::create_dir_all(dir).await {
                Ok(()) => self.session.driver().screenshot(&path).await,
                Err(e) => Err(e.into()),
            };
            match saved {
                Ok(()) => info!("📸 已保存截图: {}", path.display()),
                Err(e) => warn!("截图失败: {}", e),
            }
        }

        LocatorError::Timeout {
            step: role.step.to_string(),
            role: role.name.to_string(),
            timeout: self.ctx.step_timeout,
            url,
        }
    }

    // ========== 登录 ==========

    /// Init → PortalLoaded → (人工登录) → Authenticated
    pub async fn open_portal(&mut self) -> AppResult<()> {
        self.ctx.pause.check().await;
        let url = self.ctx.portal_url.clone();
        info!("🌐 打开门户: {}", url);
        self.session.driver().goto(&url).await?;
        self.session.remember_primary_window().await?;
        self.transition(NavState::PortalLoaded);

        self.autofill_credentials("登录").await?;
        self.ctx.checkpoint(LOGIN_PROMPT).await?;

        self.session.capture_cookies().await?;
        self.transition(NavState::Authenticated);
        Ok(())
    }

    /// 配置了凭据且登录表单存在时自动填写并提交
    async fn autofill_credentials(&self, stage: &str) -> AppResult<bool> {
        let Some(creds) = self.ctx.credentials.clone() else {
            return Ok(false);
        };
        let driver = self.session.driver();
        let probe = self.ctx.probe_timeout;
        let Some(cpf_field) = self.try_locate(roles::CPF_FIELD, probe).await? else {
            debug!("{}页面没有 CPF 输入框，跳过自动填写", stage);
            return Ok(false);
        };
        driver.fill(&cpf_field, &creds.cpf).await?;
        if let Some(password) = self.try_locate(roles::PASSWORD_FIELD, probe).await? {
            driver.fill(&password, &creds.senha).await?;
        }
        if let Some(submit) = self.try_locate(roles::LOGIN_SUBMIT, probe).await? {
            driver.click(&submit).await?;
        }
        info!("🔑 已自动填写{}表单", stage);
        Ok(true)
    }

    // ========== 受限区域 ==========

    /// Authenticated → RestrictedAreaRequested → (新窗口?) → (二次验证) → DownloadServiceOpen
    pub async fn enter_restricted_area(&mut self) -> AppResult<()> {
        let before = self.session.window_handles().await?;
        self.click(roles::RESTRICTED_AREA).await?;
        self.transition(NavState::RestrictedAreaRequested);
        self.ctx.pace().await;

        if self
            .session
            .switch_to_new_window(&before, self.ctx.probe_timeout)
            .await?
            .is_none()
        {
            debug!("受限区域在当前窗口打开");
        }
        self.dismiss_interrupts().await?;

        self.autofill_credentials("受限区域验证").await?;
        self.ctx.checkpoint(SECONDARY_AUTH_PROMPT).await?;
        self.session.capture_cookies().await?;

        self.click(roles::DOWNLOAD_SERVICE).await?;
        self.dismiss_interrupts().await?;
        self.autofill_credentials("下载服务验证").await?;
        self.ctx.checkpoint(ADDITIONAL_AUTH_PROMPT).await?;

        // 验证后门户可能再次显示服务入口
        if let Some(link) = self
            .try_locate(roles::DOWNLOAD_SERVICE, self.ctx.probe_timeout)
            .await?
        {
            self.session.driver().click(&link).await?;
            debug!("验证后再次进入下载服务");
        }

        self.session.capture_cookies().await?;
        let url = self.session.driver().current_url().await?;
        info!("✓ 已进入下载服务: {}", url);
        self.query_page_url = Some(url);
        self.transition(NavState::DownloadServiceOpen);
        Ok(())
    }

    /// 处理证书选择框和原生对话框
    ///
    /// 在整个探测时间内轮询：对话框可能接连出现，证书选择框最多确认一次。
    /// 什么都没出现不算失败。返回处理的数量。
    pub async fn dismiss_interrupts(&self) -> AppResult<usize> {
        let locator = self.ctx.locators.locator(roles::CERTIFICATE_CONFIRM)?;
        let driver = self.session.driver();
        let deadline = Instant::now() + self.ctx.probe_timeout;
        let mut handled = 0;
        let mut certificate_confirmed = false;

        loop {
            if !certificate_confirmed {
                if let Some(button) = driver.find(&locator).await? {
                    if driver.is_actionable(&button).await? {
                        driver.click(&button).await?;
                        info!("已自动确认证书选择");
                        certificate_confirmed = true;
                        handled += 1;
                    }
                }
            }
            if driver.accept_dialog().await? {
                info!("已自动接受浏览器对话框");
                handled += 1;
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(LOCATE_POLL_INTERVAL).await;
        }
        Ok(handled)
    }

    // ========== 查询循环 ==========

    /// 填写表单并提交查询 → SearchSubmitted
    pub async fn submit_search(&mut self, query: &EntityQuery) -> AppResult<()> {
        let range = query.range();
        info!(
            "{} 🔍 提交查询 {} - {}",
            query,
            range.start_text(),
            range.end_text()
        );
        self.fill(roles::START_DATE, &range.start_text()).await?;
        self.fill(roles::END_DATE, &range.end_text()).await?;
        self.fill(roles::ENTITY_ID, query.entity_id()).await?;
        self.click(query.category().option_role()).await?;
        self.click(roles::SEARCH_BUTTON).await?;
        self.transition(NavState::SearchSubmitted);
        self.ctx.pace().await;
        Ok(())
    }

    /// 等待结果表或"无结果"提示 → ResultsReady
    pub async fn await_results(&mut self, query: &EntityQuery) -> AppResult<ResultsOutcome> {
        self.ctx.pause.check().await;
        let table = self.ctx.locators.locator(roles::RESULTS_TABLE)?;
        let empty = self.ctx.locators.locator(roles::NO_RESULTS)?;
        let driver = self.session.driver();
        let deadline = Instant::now() + self.ctx.step_timeout;

        let outcome = loop {
            if driver.find(&empty).await?.is_some() {
                break ResultsOutcome::Empty;
            }
            if driver.find(&table).await?.is_some() {
                break ResultsOutcome::Ready;
            }
            if Instant::now() >= deadline {
                return Err(self.report_timeout(roles::RESULTS_TABLE).await.into());
            }
            sleep(LOCATE_POLL_INTERVAL).await;
        };

        match outcome {
            ResultsOutcome::Empty => info!("{} 查询无结果", query),
            ResultsOutcome::Ready => {
                if let Some(total) = self.reported_total().await? {
                    info!("{} 门户报告共 {} 张票据", query, total);
                }
            }
        }
        self.transition(NavState::ResultsReady);
        Ok(outcome)
    }

    /// 读取"Total de notas: N"
    async fn reported_total(&self) -> AppResult<Option<u64>> {
        let locator = self.ctx.locators.locator(roles::TOTAL_COUNT)?;
        let driver = self.session.driver();
        let Some(element) = driver.find(&locator).await? else {
            return Ok(None);
        };
        let text = driver.text(&element).await?;
        Ok(parse_total(&text))
    }

    /// 下载当前结果 → FilesExtracted
    pub async fn extract_files<F: ResourceFetcher>(
        &mut self,
        extractor: &DownloadExtractor<F>,
        query: &EntityQuery,
    ) -> AppResult<DownloadResult> {
        self.ctx.pause.check().await;
        let result = extractor
            .extract(&self.session, &self.ctx, query.entity_id(), query.category())
            .await?;
        self.transition(NavState::FilesExtracted);
        Ok(result)
    }

    /// 回到查询表单 → NextQueryReset
    ///
    /// 优先点击"Nova Consulta"；没有时直接重新打开查询页。
    pub async fn reset_query(&mut self) -> AppResult<()> {
        self.ctx.pause.check().await;
        match self.try_locate(roles::NEW_QUERY, self.ctx.probe_timeout).await? {
            Some(button) => {
                self.session.driver().click(&button).await?;
                debug!("已点击新查询");
            }
            None => {
                let driver = self.session.driver();
                match &self.query_page_url {
                    Some(url) => {
                        let url = url.split('#').next().unwrap_or(url).to_string();
                        debug!("没有新查询按钮，重新打开查询页: {}", url);
                        driver.goto(&url).await?;
                    }
                    None => driver.reload().await?,
                }
            }
        }
        self.transition(NavState::NextQueryReset);
        Ok(())
    }

    /// 切回主窗口 → Done
    pub async fn finish(&mut self) -> AppResult<()> {
        if let Err(e) = self.session.restore_primary_window().await {
            warn!("切回主窗口失败: {}", e);
        }
        self.transition(NavState::Done);
        Ok(())
    }

    /// 关闭会话（只会执行一次）
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.session.close().await
    }
}

fn parse_total(text: &str) -> Option<u64> {
    text.rsplit(':').next()?.trim().parse().ok()
}
