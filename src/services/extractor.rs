//! 下载提取 - 业务能力层
//!
//! 把结果页上的下载链接变成磁盘上的文件。单个文件失败只跳过，不影响同批其他文件。

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::{AppResult, DownloadError, FileError};
use crate::infrastructure::{BrowserDriver, WorkflowSession};
use crate::models::{roles, Category, DownloadResult};
use crate::services::context::WorkflowContext;
use crate::services::fetcher::ResourceFetcher;

/// 下载提取器
pub struct DownloadExtractor<F: ResourceFetcher> {
    fetcher: F,
    download_dir: PathBuf,
}

impl<F: ResourceFetcher> DownloadExtractor<F> {
    pub fn new(fetcher: F, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// `<下载目录>/<IE>/<票据类型>`
    pub fn target_dir(&self, entity_id: &str, category: Category) -> PathBuf {
        self.download_dir
            .join(sanitize_file_name(entity_id))
            .join(category.dir_name())
    }

    /// 下载当前结果页上的所有文件
    ///
    /// 只有目录创建失败或读取页面失败才返回错误；单个文件的失败记录日志后跳过。
    pub async fn extract<D: BrowserDriver>(
        &self,
        session: &WorkflowSession<D>,
        ctx: &WorkflowContext,
        entity_id: &str,
        category: Category,
    ) -> AppResult<DownloadResult> {
        let tag = format!("[IE {}/{}]", entity_id, category);
        let urls = self.collect_links(session, ctx).await?;
        if urls.is_empty() {
            info!("{} 结果页没有可下载的链接", tag);
            return Ok(DownloadResult::empty(entity_id, category));
        }
        info!("{} 📥 发现 {} 个下载链接", tag, urls.len());

        let dir = self.target_dir(entity_id, category);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| FileError::CreateDirFailed {
                path: dir.display().to_string(),
                source,
            })?;

        let cookies = session.live_cookies().await;
        let mut saved = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                ctx.pace().await;
            }
            let file_name = file_name_for(url, entity_id, category, index);
            let dest = dir.join(&file_name);

            let body = match self.fetcher.fetch(url.as_str(), &cookies).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("{} ⚠️ 跳过 {}: {}", tag, file_name, e);
                    continue;
                }
            };

            if let Err(source) = tokio::fs::write(&dest, &body).await {
                let e = FileError::WriteFailed {
                    path: dest.display().to_string(),
                    source,
                };
                warn!("{} ⚠️ 跳过 {}: {}", tag, file_name, e);
                continue;
            }

            debug!("{} 已保存 {} ({} 字节)", tag, dest.display(), body.len());
            saved.push(dest);
        }

        info!("{} ✓ 已保存 {}/{} 个文件", tag, saved.len(), urls.len());
        Ok(DownloadResult::new(entity_id, category, saved))
    }

    /// 读取所有下载链接并解析为绝对 URL
    async fn collect_links<D: BrowserDriver>(
        &self,
        session: &WorkflowSession<D>,
        ctx: &WorkflowContext,
    ) -> AppResult<Vec<Url>> {
        let locator = ctx.locators.locator(roles::DOWNLOAD_LINK)?;
        let driver = session.driver();
        let elements = driver.find_all(&locator).await?;
        let base = driver.current_url().await?;

        let mut urls = Vec::with_capacity(elements.len());
        for element in &elements {
            let href = match driver.attribute(element, "href").await {
                Ok(Some(href)) => href,
                Ok(None) => continue,
                Err(e) => {
                    warn!("读取下载链接失败，跳过: {}", e);
                    continue;
                }
            };
            match resolve_href(&base, &href) {
                Ok(url) => urls.push(url),
                Err(e) => warn!("{}", e),
            }
        }
        Ok(urls)
    }
}

/// 把链接解析为可下载的 http(s) 地址
pub fn resolve_href(base: &str, href: &str) -> Result<Url, DownloadError> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return Err(DownloadError::InvalidUrl(href.to_string()));
    }
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse(base)
            .and_then(|b| b.join(href))
            .map_err(|_| DownloadError::InvalidUrl(href.to_string()))?,
    };
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(DownloadError::InvalidUrl(href.to_string())),
    }
}

/// 文件名取 URL 路径的最后一段；为空时按 IE/类型/序号生成
pub fn file_name_for(url: &Url, entity_id: &str, category: Category, index: usize) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name = sanitize_file_name(last);
    if name.is_empty() || name == "." || name == ".." {
        format!("{}_{}_{}.xml", sanitize_file_name(entity_id), category, index + 1)
    } else {
        name
    }
}

fn sanitize_file_name(raw: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());
    re.replace_all(raw.trim(), "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_log, test_context, FakeDriver, FakeFetcher, RecordingGate};

    const BASE: &str = "https://portal.test/nfe/resultado";

    #[test]
    fn relative_links_resolve_against_page() {
        let url = resolve_href(BASE, "/nfe/xml/52250712345678901234550010000001231.xml").unwrap();
        assert_eq!(
            url.as_str(),
            "https://portal.test/nfe/xml/52250712345678901234550010000001231.xml"
        );
        assert!(resolve_href(BASE, "javascript:void(0)").is_err());
        assert!(resolve_href(BASE, "#").is_err());
        assert!(resolve_href(BASE, "ftp://portal.test/x.xml").is_err());
    }

    #[test]
    fn file_name_uses_trailing_segment() {
        let url = Url::parse("https://portal.test/xml/nota%201.xml?id=9").unwrap();
        assert_eq!(file_name_for(&url, "111", Category::Incoming, 0), "nota_201.xml");

        let bare = Url::parse("https://portal.test/download/").unwrap();
        assert_eq!(file_name_for(&bare, "111", Category::Outgoing, 2), "111_outgoing_3.xml");
    }

    #[tokio::test]
    async fn failed_fetches_are_skipped_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let log = new_log();
        let ctx = test_context(RecordingGate::new(log.clone()));
        let links = [
            "https://portal.test/xml/a.xml",
            "https://portal.test/xml/b.xml",
            "https://portal.test/xml/c.xml",
            "https://portal.test/xml/d.xml",
            "https://portal.test/xml/e.xml",
        ];
        let driver = FakeDriver::new(log.clone()).with_url(BASE).with_links(&links);
        let mut session = WorkflowSession::new(driver);
        let extractor = DownloadExtractor::new(
            FakeFetcher::failing(&["https://portal.test/xml/b.xml", "https://portal.test/xml/d.xml"]),
            dir.path(),
        );

        let result = extractor
            .extract(&session, &ctx, "111", Category::Incoming)
            .await
            .unwrap();

        let names: Vec<String> = result
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xml", "c.xml", "e.xml"]);
        for file in result.files() {
            assert!(file.starts_with(dir.path().join("111").join("incoming")));
            assert!(file.exists());
        }
        assert!(!dir.path().join("111/incoming/b.xml").exists());
        assert_eq!(extractor.fetcher().calls().len(), 5);
        assert!(extractor.fetcher().calls().iter().all(|(_, cookies)| *cookies == 1));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_link_is_skipped_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let log = new_log();
        let ctx = test_context(RecordingGate::new(log.clone()));
        let driver = FakeDriver::new(log)
            .with_url(BASE)
            .with_links(&["/xml/a.xml", "/xml/b.xml", "/xml/c.xml"])
            .fail_href("/xml/b.xml");
        let mut session = WorkflowSession::new(driver);
        let extractor = DownloadExtractor::new(FakeFetcher::default(), dir.path());

        let result = extractor
            .extract(&session, &ctx, "111", Category::Incoming)
            .await
            .unwrap();

        assert_eq!(result.files().len(), 2);
        assert!(dir.path().join("111/incoming/a.xml").exists());
        assert!(!dir.path().join("111/incoming/b.xml").exists());
        assert!(dir.path().join("111/incoming/c.xml").exists());
        assert_eq!(extractor.fetcher().calls().len(), 2);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn no_links_yields_empty_result_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log = new_log();
        let ctx = test_context(RecordingGate::new(log.clone()));
        let mut session = WorkflowSession::new(FakeDriver::new(log).with_url(BASE));
        let extractor = DownloadExtractor::new(FakeFetcher::default(), dir.path());

        let result = extractor
            .extract(&session, &ctx, "222", Category::Outgoing)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(!dir.path().join("222").exists());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn rerun_overwrites_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let log = new_log();
        let ctx = test_context(RecordingGate::new(log.clone()));
        let driver = FakeDriver::new(log)
            .with_url(BASE)
            .with_links(&["/xml/a.xml", "/xml/b.xml"]);
        let mut session = WorkflowSession::new(driver);
        let extractor = DownloadExtractor::new(FakeFetcher::default(), dir.path());

        let first = extractor.extract(&session, &ctx, "111", Category::Incoming).await.unwrap();
        let second = extractor.extract(&session, &ctx, "111", Category::Incoming).await.unwrap();

        assert_eq!(first.files(), second.files());
        let on_disk = std::fs::read_dir(dir.path().join("111/incoming")).unwrap().count();
        assert_eq!(on_disk, 2);
        session.close().await.unwrap();
    }
}
