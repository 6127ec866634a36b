//! 测试用的假驱动、假下载器和记录型确认闸门

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppResult, BrowserError, DownloadError};
use crate::infrastructure::{BrowserDriver, SessionCookie};
use crate::models::{roles, Category, Locator, LocatorConfig, Role};
use crate::services::{ConfirmationGate, ResourceFetcher, WorkflowContext};

pub(crate) type EventLog = Arc<Mutex<Vec<String>>>;

pub(crate) const QUERY_URL: &str = "https://portal.test/nfe/consulta";

pub(crate) fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub(crate) fn position(log: &[String], needle: &str) -> usize {
    log.iter()
        .position(|e| e == needle)
        .unwrap_or_else(|| panic!("event {:?} not found in {:?}", needle, log))
}

/// 默认定位表中某个角色的键
pub(crate) fn key(role: Role) -> String {
    LocatorConfig::defaults().locator(role).unwrap().to_string()
}

/// 测试上下文：无随机延迟，超时很短
pub(crate) fn test_context(confirm: Arc<dyn ConfirmationGate>) -> Arc<WorkflowContext> {
    let mut ctx = WorkflowContext::new(LocatorConfig::defaults(), confirm);
    ctx.portal_url = "https://portal.test/login".to_string();
    ctx.step_timeout = Duration::from_millis(300);
    ctx.probe_timeout = Duration::from_millis(20);
    ctx.delay = (0.0, 0.0);
    Arc::new(ctx)
}

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    pub key: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum Effect {
    OpenWindow(String),
    Show(Role),
    Hide(Role),
    Navigate(String),
    Dialog,
    Search,
    ClearResults,
}

#[derive(Default)]
struct FakeState {
    url: String,
    visible: HashSet<String>,
    on_click: HashMap<String, Vec<Effect>>,
    windows: Vec<String>,
    current: String,
    values: HashMap<String, String>,
    selected_option: Option<String>,
    results: HashMap<(String, String), Vec<String>>,
    links: Vec<String>,
    unresponsive: HashSet<String>,
    failing_clicks: HashSet<String>,
    failing_hrefs: HashSet<String>,
    on_dialog: Vec<Effect>,
    pending_dialogs: usize,
    cookies: Vec<SessionCookie>,
    closes: usize,
}

/// 脚本化的门户
pub(crate) struct FakeDriver {
    state: Mutex<FakeState>,
    events: EventLog,
}

impl FakeDriver {
    pub fn new(events: EventLog) -> Self {
        let state = FakeState {
            windows: vec!["main".to_string()],
            current: "main".to_string(),
            cookies: vec![SessionCookie::new("JSESSIONID", "fake")],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            events,
        }
    }

    /// 完整的门户流程：受限区域在新窗口打开，下载服务打开查询表单
    pub fn portal(events: EventLog) -> Self {
        Self::new(events)
            .show(roles::RESTRICTED_AREA)
            .on_click(
                roles::RESTRICTED_AREA,
                vec![
                    Effect::OpenWindow("secondary".to_string()),
                    Effect::Show(roles::DOWNLOAD_SERVICE),
                ],
            )
            .on_click(
                roles::DOWNLOAD_SERVICE,
                vec![
                    Effect::Navigate(QUERY_URL.to_string()),
                    Effect::Hide(roles::DOWNLOAD_SERVICE),
                    Effect::Show(roles::START_DATE),
                    Effect::Show(roles::END_DATE),
                    Effect::Show(roles::ENTITY_ID),
                    Effect::Show(roles::INCOMING_OPTION),
                    Effect::Show(roles::OUTGOING_OPTION),
                    Effect::Show(roles::SEARCH_BUTTON),
                ],
            )
            .on_click(roles::SEARCH_BUTTON, vec![Effect::Search])
            .on_click(roles::NEW_QUERY, vec![Effect::ClearResults])
    }

    pub fn show(self, role: Role) -> Self {
        self.state.lock().unwrap().visible.insert(key(role));
        self
    }

    pub fn on_click(self, role: Role, effects: Vec<Effect>) -> Self {
        self.state.lock().unwrap().on_click.insert(key(role), effects);
        self
    }

    pub fn with_results(self, entity: &str, category: Category, links: &[&str]) -> Self {
        self.state.lock().unwrap().results.insert(
            (entity.to_string(), key(category.option_role())),
            links.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// 该 IE 的查询提交后页面没有任何变化
    pub fn unresponsive_for(self, entity: &str) -> Self {
        self.state.lock().unwrap().unresponsive.insert(entity.to_string());
        self
    }

    /// 点击该控件时驱动报错
    pub fn fail_click(self, role: Role) -> Self {
        self.state.lock().unwrap().failing_clicks.insert(key(role));
        self
    }

    /// 读取该链接的 href 时驱动报错（例如元素已失效）
    pub fn fail_href(self, href: &str) -> Self {
        self.state.lock().unwrap().failing_hrefs.insert(href.to_string());
        self
    }

    /// 接受对话框后页面的变化
    pub fn on_dialog(self, effects: Vec<Effect>) -> Self {
        self.state.lock().unwrap().on_dialog = effects;
        self
    }

    pub fn with_links(self, links: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.links = links.iter().map(|l| l.to_string()).collect();
            state.visible.insert(key(roles::RESULTS_TABLE));
        }
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.state.lock().unwrap().url = url.to_string();
        self
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn apply(&self, state: &mut FakeState, effect: &Effect) {
        match effect {
            Effect::OpenWindow(handle) => state.windows.push(handle.clone()),
            Effect::Show(role) => {
                state.visible.insert(key(*role));
            }
            Effect::Hide(role) => {
                state.visible.remove(&key(*role));
            }
            Effect::Navigate(url) => state.url = url.clone(),
            Effect::Dialog => state.pending_dialogs += 1,
            Effect::Search => {
                let entity = state
                    .values
                    .get(&key(roles::ENTITY_ID))
                    .cloned()
                    .unwrap_or_default();
                if state.unresponsive.contains(&entity) {
                    return;
                }
                let option = state.selected_option.clone().unwrap_or_default();
                let links = state
                    .results
                    .get(&(entity, option))
                    .cloned()
                    .unwrap_or_default();
                state.visible.insert(key(roles::NEW_QUERY));
                if links.is_empty() {
                    state.visible.insert(key(roles::NO_RESULTS));
                } else {
                    state.visible.insert(key(roles::RESULTS_TABLE));
                }
                state.links = links;
            }
            Effect::ClearResults => {
                state.visible.remove(&key(roles::RESULTS_TABLE));
                state.visible.remove(&key(roles::NO_RESULTS));
                state.visible.remove(&key(roles::NEW_QUERY));
                state.links.clear();
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> AppResult<()> {
        self.record(format!("goto:{}", url));
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn reload(&self) -> AppResult<()> {
        self.record("reload".to_string());
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn find(&self, locator: &Locator) -> AppResult<Option<FakeElement>> {
        let key = locator.to_string();
        let state = self.state.lock().unwrap();
        Ok(state.visible.contains(&key).then(|| FakeElement { key, href: None }))
    }

    async fn find_all(&self, locator: &Locator) -> AppResult<Vec<FakeElement>> {
        let key = locator.to_string();
        let state = self.state.lock().unwrap();
        if key == crate::testing::key(roles::DOWNLOAD_LINK) {
            return Ok(state
                .links
                .iter()
                .map(|href| FakeElement {
                    key: key.clone(),
                    href: Some(href.clone()),
                })
                .collect());
        }
        Ok(if state.visible.contains(&key) {
            vec![FakeElement { key, href: None }]
        } else {
            Vec::new()
        })
    }

    async fn is_actionable(&self, _element: &FakeElement) -> AppResult<bool> {
        Ok(true)
    }

    async fn click(&self, element: &FakeElement) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_clicks.contains(&element.key) {
            return Err(BrowserError::Protocol(format!("click failed: {}", element.key).into()).into());
        }
        self.record(format!("click:{}", element.key));
        if element.key == key(roles::INCOMING_OPTION) || element.key == key(roles::OUTGOING_OPTION) {
            state.selected_option = Some(element.key.clone());
        }
        let effects = state.on_click.get(&element.key).cloned().unwrap_or_default();
        for effect in &effects {
            self.apply(&mut state, effect);
        }
        Ok(())
    }

    async fn fill(&self, element: &FakeElement, text: &str) -> AppResult<()> {
        self.record(format!("fill:{}={}", element.key, text));
        self.state
            .lock()
            .unwrap()
            .values
            .insert(element.key.clone(), text.to_string());
        Ok(())
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> AppResult<Option<String>> {
        if let Some(href) = &element.href {
            if self.state.lock().unwrap().failing_hrefs.contains(href) {
                return Err(BrowserError::Protocol(format!("stale element: {}", href).into()).into());
            }
        }
        Ok(if name == "href" { element.href.clone() } else { None })
    }

    async fn text(&self, _element: &FakeElement) -> AppResult<String> {
        Ok(String::new())
    }

    async fn window_handles(&self) -> AppResult<Vec<String>> {
        Ok(self.state.lock().unwrap().windows.clone())
    }

    async fn current_window(&self) -> AppResult<String> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.windows.iter().any(|w| w == handle) {
            return Err(BrowserError::WindowNotFound(handle.to_string()).into());
        }
        state.current = handle.to_string();
        drop(state);
        self.record(format!("switch:{}", handle));
        Ok(())
    }

    async fn cookies(&self) -> AppResult<Vec<SessionCookie>> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn accept_dialog(&self) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.pending_dialogs == 0 {
            return Ok(false);
        }
        state.pending_dialogs -= 1;
        let effects = std::mem::take(&mut state.on_dialog);
        for effect in &effects {
            self.apply(&mut state, effect);
        }
        drop(state);
        self.record("dialog:accepted".to_string());
        Ok(true)
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        self.record(format!("screenshot:{}", path.display()));
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.state.lock().unwrap().closes += 1;
        self.record("close".to_string());
        Ok(())
    }
}

/// 记录所有确认请求，立即确认
pub(crate) struct RecordingGate {
    events: EventLog,
}

impl RecordingGate {
    pub fn new(events: EventLog) -> Arc<Self> {
        Arc::new(Self { events })
    }
}

#[async_trait]
impl ConfirmationGate for RecordingGate {
    async fn confirm(&self, message: &str) -> AppResult<()> {
        self.events.lock().unwrap().push(format!("confirm:{}", message));
        Ok(())
    }
}

/// URL 在 `failing` 中时返回 500，否则返回以 URL 为内容的 XML
#[derive(Default)]
pub(crate) struct FakeFetcher {
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl FakeFetcher {
    pub fn failing(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (url, 携带的 Cookie 数量)
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, cookies: &[SessionCookie]) -> Result<Vec<u8>, DownloadError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), cookies.len()));
        if self.failing.contains(url) {
            return Err(DownloadError::BadStatus {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(format!("<nfeProc>{}</nfeProc>", url).into_bytes())
    }
}
