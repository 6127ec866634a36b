//! 带认证的资源下载 - 业务能力层
//!
//! 直接用 HTTP 请求下载，绕过浏览器的保存对话框。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use tracing::debug;

use crate::error::DownloadError;
use crate::infrastructure::{cookie_header, SessionCookie};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// 资源下载器
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// 携带 Cookie 下载资源，返回响应体
    async fn fetch(&self, url: &str, cookies: &[SessionCookie]) -> Result<Vec<u8>, DownloadError>;
}

/// 基于 reqwest 的下载器
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cookies: &[SessionCookie]) -> Result<Vec<u8>, DownloadError> {
        debug!("下载: {}", url);
        let mut request = self.client.get(url).header(USER_AGENT, DEFAULT_USER_AGENT);
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookie_header(cookies));
        }

        let response = request
            .send()
            .await
            .map_err(|source| DownloadError::RequestFailed {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| DownloadError::RequestFailed {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}
