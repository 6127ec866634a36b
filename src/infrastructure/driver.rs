//! 浏览器驱动抽象 - 基础设施层
//!
//! 工作流只依赖这个 trait，真实实现是 [`CdpDriver`](super::CdpDriver)，
//! 测试使用脚本化的假驱动。

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::Locator;

/// 会话 Cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// 拼接为 `Cookie` 请求头
pub fn cookie_header(cookies: &[SessionCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 浏览器驱动
///
/// 所有方法只做单次操作，不等待；等待和超时由工作流层负责。
/// `find` 在元素不存在时返回 `Ok(None)`。
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Element: Send + Sync;

    async fn goto(&self, url: &str) -> AppResult<()>;

    async fn reload(&self) -> AppResult<()>;

    async fn current_url(&self) -> AppResult<String>;

    async fn find(&self, locator: &Locator) -> AppResult<Option<Self::Element>>;

    async fn find_all(&self, locator: &Locator) -> AppResult<Vec<Self::Element>>;

    /// 元素可见且未禁用
    async fn is_actionable(&self, element: &Self::Element) -> AppResult<bool>;

    async fn click(&self, element: &Self::Element) -> AppResult<()>;

    /// 清空并输入文本
    async fn fill(&self, element: &Self::Element, text: &str) -> AppResult<()>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> AppResult<Option<String>>;

    async fn text(&self, element: &Self::Element) -> AppResult<String>;

    /// 所有窗口句柄
    async fn window_handles(&self) -> AppResult<Vec<String>>;

    async fn current_window(&self) -> AppResult<String>;

    async fn switch_to_window(&self, handle: &str) -> AppResult<()>;

    async fn cookies(&self) -> AppResult<Vec<SessionCookie>>;

    /// 接受当前的原生对话框，没有对话框时返回 `false`
    async fn accept_dialog(&self) -> AppResult<bool>;

    async fn screenshot(&self, path: &Path) -> AppResult<()>;

    /// 关闭浏览器，重复调用无副作用
    async fn close(&self) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_joins_pairs() {
        let cookies = vec![
            SessionCookie::new("JSESSIONID", "abc"),
            SessionCookie::new("token", "xyz"),
        ];
        assert_eq!(cookie_header(&cookies), "JSESSIONID=abc; token=xyz");
        assert_eq!(cookie_header(&[]), "");
    }
}
