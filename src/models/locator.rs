//! 页面元素定位表达式
//!
//! 覆盖文件中的定位器是带前缀的字符串：
//!
//! | 前缀      | 含义                | 示例                                   |
//! |-----------|---------------------|----------------------------------------|
//! | `id:`     | 元素 id             | `id:dataInicio`                        |
//! | `name:`   | 表单字段 name       | `name:cpf`                             |
//! | `link:`   | 链接文字（精确）    | `link:Acesso Restrito`                 |
//! | `xpath:`  | XPath 表达式        | `xpath://label[contains(., 'Saidas')]` |
//! | `css:`    | CSS 选择器          | `css:table`                            |
//!
//! 没有前缀时，以 `/` 或 `(` 开头按 XPath 处理，其余按 CSS 处理。

use std::fmt;

/// 定位器
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Name(String),
    LinkText(String),
    XPath(String),
    Css(String),
}

/// 浏览器可直接执行的查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    XPath(String),
}

impl Locator {
    /// 解析定位表达式，不会失败
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if let Some(rest) = expr.strip_prefix("id:") {
            return Locator::Id(rest.trim().to_string());
        }
        if let Some(rest) = expr.strip_prefix("name:") {
            return Locator::Name(rest.trim().to_string());
        }
        if let Some(rest) = expr.strip_prefix("link:") {
            return Locator::LinkText(rest.trim().to_string());
        }
        if let Some(rest) = expr.strip_prefix("xpath:") {
            return Locator::XPath(rest.trim().to_string());
        }
        if let Some(rest) = expr.strip_prefix("css:") {
            return Locator::Css(rest.trim().to_string());
        }
        if expr.starts_with('/') || expr.starts_with('(') {
            Locator::XPath(expr.to_string())
        } else {
            Locator::Css(expr.to_string())
        }
    }

    /// 转换为 CSS 或 XPath 查询
    pub fn query(&self) -> Query {
        match self {
            Locator::Id(id) => Query::Css(format!("[id=\"{}\"]", css_escape(id))),
            Locator::Name(name) => Query::Css(format!("[name=\"{}\"]", css_escape(name))),
            Locator::LinkText(text) => Query::XPath(format!(
                "//a[normalize-space(.)={}]",
                xpath_literal(text)
            )),
            Locator::XPath(xpath) => Query::XPath(xpath.clone()),
            Locator::Css(css) => Query::Css(css.clone()),
        }
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id:{}", v),
            Locator::Name(v) => write!(f, "name:{}", v),
            Locator::LinkText(v) => write!(f, "link:{}", v),
            Locator::XPath(v) => write!(f, "xpath:{}", v),
            Locator::Css(v) => write!(f, "css:{}", v),
        }
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// XPath 1.0 没有转义语法，两种引号都出现时只能用 concat()
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
