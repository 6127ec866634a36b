use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 页面元素定位错误
    #[error("定位错误: {0}")]
    Locator(#[from] LocatorError),
    /// 下载错误
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 人工确认通道已关闭
    #[error("人工确认通道已关闭: {0}")]
    PromptClosed(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 窗口不存在
    #[error("窗口不存在: {0}")]
    WindowNotFound(String),
    /// 页面协议调用失败
    #[error("页面操作失败: {0}")]
    Protocol(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// 会话已关闭
    #[error("浏览器会话已关闭")]
    SessionClosed,
}

/// 页面元素定位错误
///
/// 超时属于可恢复错误，调用方决定放弃当前 IE 还是整个批次。
#[derive(Debug, Error)]
pub enum LocatorError {
    /// 等待元素超时
    #[error("等待元素超时 ({step}.{role}, {timeout:?}) 当前页面: {url}")]
    Timeout {
        step: String,
        role: String,
        timeout: Duration,
        url: String,
    },
    /// 未知的定位角色
    #[error("未配置的定位角色: {step}.{role}")]
    UnknownRole { step: String, role: String },
}

/// 下载错误（单个文件，不会中断批次）
#[derive(Debug, Error)]
pub enum DownloadError {
    /// 网络请求失败
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务器返回非成功状态
    #[error("服务器返回 {status} ({url})")]
    BadStatus { url: String, status: u16 },
    /// 链接无效
    #[error("无效的下载链接: {0}")]
    InvalidUrl(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 其他 IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 日期格式错误
    #[error("日期 '{0}' 格式错误，应为 DD/MM/AAAA")]
    InvalidDate(String),
    /// 日期区间错误
    #[error("开始日期 {start} 晚于结束日期 {end}")]
    InvalidRange { start: String, end: String },
    /// IE 列表为空
    #[error("至少需要一个 IE")]
    NoEntities,
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Protocol(Box::new(err)))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::Io(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 是否为可恢复的定位超时
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Locator(LocatorError::Timeout { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
